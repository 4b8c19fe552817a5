//! Market-DNA synthesis and creative benchmark reports.
//!
//! Every operation is generic over [`dnalens_gemini::CreativeService`], so
//! the server and CLI pass a `GeminiClient` while tests pass fakes.

pub mod error;
pub mod report;
pub mod state;
pub mod synthesizer;

pub use error::{PipelineError, SynthesisFailure};
pub use report::{analyze_creative, build_prompt, report_on_insight, CreativeReport};
pub use state::DnaState;
pub use synthesizer::{get_winning_dna, get_winning_dna_with_policy, CreativePolicy};
