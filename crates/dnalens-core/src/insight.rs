use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::profile::value_text;

/// Structured traits extracted from one video by the generation service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_style: Option<String>,
    /// Keys the model added beyond the four requested ones.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-video analysis result.
///
/// Failures are values, not errors: a video that could not be processed or
/// whose analysis was not valid JSON becomes [`VideoInsight::Failed`], which
/// serializes as `{"error": "<message>"}` and is passed on to later prompts
/// so the model can reason over partial failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VideoInsight {
    Failed { error: String },
    Extracted(InsightFields),
}

impl VideoInsight {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            error: message.into(),
        }
    }

    /// Builds an insight from the JSON the service returned.
    ///
    /// Any JSON object is accepted. Scalars in the known fields keep their
    /// JSON text (`0.8` becomes `"0.8"`) and unrecognised keys are carried
    /// in [`InsightFields::extra`]. An object with a string `error` is
    /// taken as the model reporting a failure. Non-objects become an error
    /// marker.
    #[must_use]
    pub fn from_model_json(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::failed("Failed to parse video analysis: expected a JSON object");
        };
        if let Some(Value::String(error)) = map.get("error") {
            return Self::failed(error.clone());
        }
        let motivation = take_text(&mut map, "motivation");
        let pacing = take_text(&mut map, "pacing");
        let mechanic = take_text(&mut map, "mechanic");
        let visual_style = take_text(&mut map, "visual_style");
        Self::Extracted(InsightFields {
            motivation,
            pacing,
            mechanic,
            visual_style,
            extra: map,
        })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Extracted(_) => None,
        }
    }

    /// Pretty JSON used when embedding the insight into prompts.
    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn take_text(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    map.remove(key).as_ref().and_then(value_text)
}
