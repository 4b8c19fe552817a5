use std::path::{Path, PathBuf};

use dnalens_core::{ProfileStore, WinningDna};

use crate::error::PipelineError;

pub const NO_MARKET_DATA: &str = "No market data uploaded. Upload a competitor CSV first.";

/// Process-wide state: the current profile, the last uploaded dataset and
/// whether a synthesis is running.
///
/// Owned by one caller at a time; the server shares it behind an async mutex.
#[derive(Debug)]
pub struct DnaState {
    store: ProfileStore,
    profile: Option<WinningDna>,
    market_data: Option<PathBuf>,
    /// Replaced datasets held back while a synthesis may still read them.
    retired: Vec<PathBuf>,
    processing: bool,
}

impl DnaState {
    /// Loads the persisted profile, if any.
    ///
    /// A profile file that cannot be read or parsed is logged and ignored so
    /// the process still starts.
    #[must_use]
    pub fn load(store: ProfileStore) -> Self {
        let profile = match store.load() {
            Ok(Some(profile)) => {
                tracing::info!(path = %store.path().display(), "loaded persisted winning DNA");
                Some(profile)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, "ignoring unreadable winning DNA file");
                None
            }
        };
        Self {
            store,
            profile,
            market_data: None,
            retired: Vec::new(),
            processing: false,
        }
    }

    #[must_use]
    pub fn profile(&self) -> Option<&WinningDna> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn market_data(&self) -> Option<&Path> {
        self.market_data.as_deref()
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Remembers a newly uploaded dataset and returns the one it replaces
    /// when that file can be removed now.
    ///
    /// While a synthesis is running the replaced path is held back and
    /// handed out by [`DnaState::finish_synthesis`] instead. The current
    /// profile is kept until a new synthesis finishes.
    pub fn set_market_data(&mut self, path: PathBuf) -> Option<PathBuf> {
        let previous = self.market_data.replace(path)?;
        if self.processing {
            self.retired.push(previous);
            return None;
        }
        Some(previous)
    }

    /// Marks a synthesis as started and returns the dataset to read.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Precondition`] without a dataset, [`PipelineError::Busy`]
    /// while another synthesis is running.
    pub fn begin_synthesis(&mut self) -> Result<PathBuf, PipelineError> {
        let Some(path) = self.market_data.clone() else {
            return Err(PipelineError::Precondition(NO_MARKET_DATA.to_string()));
        };
        if self.processing {
            return Err(PipelineError::Busy);
        }
        self.processing = true;
        Ok(path)
    }

    /// Clears the running flag and installs `profile` when synthesis succeeded.
    ///
    /// Returns the datasets replaced during the run, which are now safe to
    /// remove. A failed save is logged; the new profile is still served
    /// from memory.
    pub fn finish_synthesis(&mut self, profile: Option<WinningDna>) -> Vec<PathBuf> {
        self.processing = false;
        if let Some(profile) = profile {
            if let Err(e) = self.store.save(&profile) {
                tracing::error!(error = %e, "failed to persist winning DNA");
            }
            self.profile = Some(profile);
        }
        std::mem::take(&mut self.retired)
    }
}
