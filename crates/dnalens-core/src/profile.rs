//! The "Winning DNA" profile and its on-disk persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::dataset::NOT_AVAILABLE;

/// Common traits of top-performing competitor creatives.
///
/// Always serialized with exactly these four keys; absent values become
/// `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningDna {
    #[serde(default)]
    pub dominant_motivation: Option<String>,
    #[serde(default)]
    pub avg_pacing: Option<String>,
    #[serde(default)]
    pub key_mechanic: Option<String>,
    #[serde(default)]
    pub visual_trend: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("expected a JSON object for the profile, got {0}")]
    NotAnObject(&'static str),

    #[error("profile I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile file {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl WinningDna {
    /// Builds a profile from the synthesis response.
    ///
    /// Missing and `null` keys stay `None`. Scalar values that are not
    /// strings keep their JSON text (`0.8` → `"0.8"`), as do nested values.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotAnObject`] if `value` is not a JSON object.
    pub fn from_model_json(value: &Value) -> Result<Self, ProfileError> {
        let Value::Object(map) = value else {
            return Err(ProfileError::NotAnObject(json_kind(value)));
        };
        let field = |key: &str| map.get(key).and_then(value_text);
        Ok(Self {
            dominant_motivation: field("dominant_motivation"),
            avg_pacing: field("avg_pacing"),
            key_mechanic: field("key_mechanic"),
            visual_trend: field("visual_trend"),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dominant_motivation.is_none()
            && self.avg_pacing.is_none()
            && self.key_mechanic.is_none()
            && self.visual_trend.is_none()
    }

    /// Field values with `N/A` substituted for missing ones, in prompt order.
    #[must_use]
    pub fn display_fields(&self) -> [(&'static str, &str); 4] {
        fn show(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or(NOT_AVAILABLE)
        }
        [
            ("Dominant Motivation", show(&self.dominant_motivation)),
            ("Avg. Pacing (Cuts)", show(&self.avg_pacing)),
            ("Key Mechanic", show(&self.key_mechanic)),
            ("Visual Trend", show(&self.visual_trend)),
        ]
    }

    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Text of a model-supplied value: `null` is absent, strings are taken as
/// is, anything else keeps its JSON text.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Single-file JSON persistence for the current profile.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted profile, `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Io`] if the file exists but cannot be read and
    /// [`ProfileError::Corrupt`] if it is not a valid profile.
    pub fn load(&self) -> Result<Option<WinningDna>, ProfileError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProfileError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ProfileError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Replaces the persisted profile.
    ///
    /// Writes a sibling `.tmp` file and renames it over the target so readers
    /// never observe a partial file.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Io`] on any filesystem failure.
    pub fn save(&self, profile: &WinningDna) -> Result<(), ProfileError> {
        let io_err = |source| ProfileError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let body = serde_json::to_string_pretty(profile).map_err(|e| io_err(e.into()))?;
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        tracing::info!(path = %self.path.display(), "persisted winning DNA profile");
        Ok(())
    }
}
