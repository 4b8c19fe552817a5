//! Benchmark report for a single creative against the current profile.

use dnalens_core::prompts::{ANALYZER_PROMPT_TEMPLATE, BENCHMARK_PLACEHOLDER};
use dnalens_core::{CreativeRef, VideoInsight, WinningDna};
use dnalens_gemini::CreativeService;
use serde::Serialize;

use crate::error::PipelineError;

pub const MISSING_PROFILE: &str = "Winning DNA not found. Please analyze market data first.";

/// Report text plus the insight it was based on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreativeReport {
    pub report: String,
    pub creative_insight: VideoInsight,
}

/// Renders the analyzer system prompt with the profile's benchmark block.
///
/// Missing profile fields render as `N/A`.
#[must_use]
pub fn build_prompt(profile: &WinningDna) -> String {
    let block: String = profile
        .display_fields()
        .iter()
        .map(|(label, value)| format!("* **{label}:** {value}\n"))
        .collect();
    ANALYZER_PROMPT_TEMPLATE.replace(BENCHMARK_PLACEHOLDER, block.trim_end())
}

fn report_context(profile: &WinningDna, insight: &VideoInsight) -> String {
    format!(
        "MARKET BENCHMARK (WINNING DNA):\n{}\n\nUSER CREATIVE ANALYSIS:\n{}\n",
        profile.to_pretty_json(),
        insight.to_pretty_json()
    )
}

/// Scores `creative` against `profile`.
///
/// An insight that came back as an error marker is still sent on, so the
/// report can say what could not be analyzed.
///
/// # Errors
///
/// - [`PipelineError::Precondition`] if there is no profile yet. No service
///   call is made.
/// - [`PipelineError::Service`] if either service call fails.
pub async fn analyze_creative<S: CreativeService>(
    service: &S,
    creative: &CreativeRef,
    profile: Option<&WinningDna>,
) -> Result<CreativeReport, PipelineError> {
    let Some(profile) = profile else {
        return Err(PipelineError::Precondition(MISSING_PROFILE.to_string()));
    };

    let creative_insight = service.analyze_video(creative).await?;
    if let Some(error) = creative_insight.error() {
        tracing::warn!(creative = %creative, error, "creative analysis degraded; reporting anyway");
    }
    report_on_insight(service, creative, profile, creative_insight).await
}

/// Writes the benchmark report for an insight that is already extracted.
///
/// # Errors
///
/// [`PipelineError::Service`] if the report call fails.
pub async fn report_on_insight<S: CreativeService>(
    service: &S,
    creative: &CreativeRef,
    profile: &WinningDna,
    creative_insight: VideoInsight,
) -> Result<CreativeReport, PipelineError> {
    tracing::info!(creative = %creative, "generating benchmark report");
    let report = service
        .generate(
            &build_prompt(profile),
            &report_context(profile, &creative_insight),
            None,
        )
        .await?;

    Ok(CreativeReport {
        report,
        creative_insight,
    })
}
