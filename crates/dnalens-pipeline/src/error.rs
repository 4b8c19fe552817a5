use std::path::PathBuf;

use dnalens_core::{DatasetError, ParseError, ProfileError};
use dnalens_gemini::ServiceError;
use thiserror::Error;

/// Why the synthesis response could not become a profile.
#[derive(Debug, Error)]
pub enum SynthesisFailure {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Shape(#[from] ProfileError),
}

/// Top-level failures of the synthesis and report operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("no usable rows in {}; check the Advertiser App and Impression Share columns", path.display())]
    EmptyDataset { path: PathBuf },

    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The final synthesis answer was not a usable JSON object.
    #[error("model returned invalid Winning DNA JSON ({source}): {preview}")]
    Synthesis {
        preview: String,
        #[source]
        source: SynthesisFailure,
    },

    /// The operation needs something that is not there yet.
    #[error("{0}")]
    Precondition(String),

    #[error("a market synthesis is already running")]
    Busy,
}
