//! Market-DNA synthesis: analyze the top competitor creatives and condense
//! them into one [`WinningDna`].

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use dnalens_core::dataset::NOT_AVAILABLE;
use dnalens_core::prompts::BENCHMARK_SYNTHESIZER_PROMPT;
use dnalens_core::{
    extract_json, read_dataset, select_top, CompetitorRow, CreativeRef, VideoInsight, WinningDna,
};
use dnalens_gemini::CreativeService;

use crate::error::{PipelineError, SynthesisFailure};

const PREVIEW_CHARS: usize = 100;

/// Which creative references from a dataset may be opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CreativePolicy {
    /// Any URL or local path.
    #[default]
    Any,
    /// URLs, plus local files that resolve to somewhere inside the
    /// given directory.
    RemoteOrWithin(PathBuf),
}

impl CreativePolicy {
    /// Local paths are resolved through symlinks and `..` before the
    /// check; a path that does not resolve is refused.
    #[must_use]
    pub fn permits(&self, creative: &CreativeRef) -> bool {
        match (self, creative) {
            (Self::Any, _) | (_, CreativeRef::Remote(_)) => true,
            (Self::RemoteOrWithin(root), CreativeRef::Local(path)) => {
                match (std::fs::canonicalize(root), std::fs::canonicalize(path)) {
                    (Ok(root), Ok(path)) => path.starts_with(root),
                    _ => false,
                }
            }
        }
    }
}

/// [`get_winning_dna_with_policy`] with every creative reference allowed.
///
/// # Errors
///
/// Same as [`get_winning_dna_with_policy`].
pub async fn get_winning_dna<S: CreativeService>(
    service: &S,
    dataset_path: &Path,
    top_n: usize,
) -> Result<WinningDna, PipelineError> {
    get_winning_dna_with_policy(service, dataset_path, top_n, &CreativePolicy::Any).await
}

/// Reads `dataset_path`, analyzes the `top_n` rows by impression share and
/// asks the model for the shared traits.
///
/// Per-row analysis failures are recorded as error markers and the batch
/// continues; only the final synthesis call can fail the operation. Rows
/// whose creative `policy` refuses get a marker without a service call.
///
/// # Errors
///
/// - [`PipelineError::Dataset`] if the file is unreadable or malformed.
/// - [`PipelineError::EmptyDataset`] if no rows were selected. No service
///   call is made in that case.
/// - [`PipelineError::Service`] if the synthesis call fails.
/// - [`PipelineError::Synthesis`] if its answer is not a JSON object.
pub async fn get_winning_dna_with_policy<S: CreativeService>(
    service: &S,
    dataset_path: &Path,
    top_n: usize,
    policy: &CreativePolicy,
) -> Result<WinningDna, PipelineError> {
    tracing::info!(path = %dataset_path.display(), "processing market data");
    let rows = read_dataset(dataset_path)?;
    let total = rows.len();
    let selected = select_top(rows, top_n);
    if selected.is_empty() {
        return Err(PipelineError::EmptyDataset {
            path: dataset_path.to_path_buf(),
        });
    }
    tracing::info!(
        total,
        selected = selected.len(),
        "analyzing top creatives by impression share"
    );

    let mut blocks = Vec::with_capacity(selected.len());
    for (idx, row) in selected.iter().enumerate() {
        let number = idx + 1;
        tracing::info!(
            number,
            of = selected.len(),
            app = %row.app_name,
            creative = row.creative.as_deref().unwrap_or(NOT_AVAILABLE),
            "analyzing competitor creative"
        );
        let insight = analyze_row(service, row, policy).await;
        blocks.push(creative_block(number, row, &insight));
    }

    tracing::info!("synthesizing winning DNA from aggregate analysis");
    let response = service
        .generate(BENCHMARK_SYNTHESIZER_PROMPT, &blocks.join("\n"), None)
        .await?;
    let profile = parse_profile(&response)?;
    if profile.is_empty() {
        tracing::warn!("synthesis returned none of the expected keys");
    }
    Ok(profile)
}

async fn analyze_row<S: CreativeService>(
    service: &S,
    row: &CompetitorRow,
    policy: &CreativePolicy,
) -> VideoInsight {
    let Some(creative) = row.creative_ref() else {
        return VideoInsight::failed("No creative reference for this row");
    };
    if !policy.permits(&creative) {
        tracing::warn!(app = %row.app_name, %creative, "creative path refused");
        return VideoInsight::failed(format!("Local creative path not allowed: {creative}"));
    }
    match service.analyze_video(&creative).await {
        Ok(insight) => insight,
        Err(e) => {
            tracing::warn!(app = %row.app_name, error = %e, "creative analysis failed; continuing");
            VideoInsight::failed(e.to_string())
        }
    }
}

/// Text block describing one analyzed row, as fed to the synthesis prompt.
pub(crate) fn creative_block(number: usize, row: &CompetitorRow, insight: &VideoInsight) -> String {
    let share = row.impression_share_raw.as_deref().unwrap_or(NOT_AVAILABLE);
    let duration = row
        .duration
        .as_deref()
        .map_or_else(|| NOT_AVAILABLE.to_string(), |d| format!("{d}s"));

    let mut block = String::new();
    let _ = writeln!(block, "Creative #{number}:");
    let _ = writeln!(block, "- App: {}", row.app_name);
    let _ = writeln!(block, "- Stats: {share} Share, Duration {duration}");
    let _ = writeln!(block, "- Extracted Data: {}", insight.to_pretty_json());
    block
}

fn parse_profile(response: &str) -> Result<WinningDna, PipelineError> {
    let failure = |source: SynthesisFailure| PipelineError::Synthesis {
        preview: response.chars().take(PREVIEW_CHARS).collect(),
        source,
    };
    let value = extract_json(response).map_err(|e| failure(e.into()))?;
    WinningDna::from_model_json(&value).map_err(|e| failure(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(app: &str, share: Option<&str>, duration: Option<&str>) -> CompetitorRow {
        CompetitorRow {
            position: 0,
            app_name: app.to_string(),
            impression_share_raw: share.map(str::to_string),
            impression_share: 0.0,
            creative: None,
            duration: duration.map(str::to_string),
        }
    }

    #[test]
    fn any_policy_permits_local_paths() {
        let policy = CreativePolicy::Any;
        assert!(policy.permits(&CreativeRef::local("/nonexistent/ad.mp4")));
        assert!(policy.permits(&CreativeRef::Remote("https://cdn.example/ad.mp4".into())));
    }

    #[test]
    fn restricted_policy_allows_urls_and_files_inside_root() {
        let root = tempfile::tempdir().unwrap();
        let inside = root.path().join("ad.mp4");
        std::fs::write(&inside, b"video").unwrap();
        let policy = CreativePolicy::RemoteOrWithin(root.path().to_path_buf());

        assert!(policy.permits(&CreativeRef::local(&inside)));
        assert!(policy.permits(&CreativeRef::Remote("https://cdn.example/ad.mp4".into())));
    }

    #[test]
    fn restricted_policy_refuses_files_outside_root() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data");
        std::fs::create_dir(&data).unwrap();
        let secret = root.path().join(".env");
        std::fs::write(&secret, b"GEMINI_API_KEY=x").unwrap();
        let policy = CreativePolicy::RemoteOrWithin(data.clone());

        assert!(!policy.permits(&CreativeRef::local(&secret)));
        assert!(!policy.permits(&CreativeRef::local(data.join("..").join(".env"))));
        assert!(!policy.permits(&CreativeRef::local(data.join("missing.mp4"))));
    }

    #[test]
    fn block_lists_row_metadata_and_insight() {
        let block = creative_block(
            2,
            &row("Puzzle Quest", Some("14.09%"), Some("30")),
            &VideoInsight::failed("boom"),
        );
        assert!(block.starts_with("Creative #2:\n"));
        assert!(block.contains("- App: Puzzle Quest\n"));
        assert!(block.contains("- Stats: 14.09% Share, Duration 30s\n"));
        assert!(block.contains("\"error\": \"boom\""));
    }

    #[test]
    fn block_uses_placeholder_for_missing_values() {
        let block = creative_block(1, &row("X", None, None), &VideoInsight::failed("x"));
        assert!(block.contains("- Stats: N/A Share, Duration N/A\n"), "{block}");
    }

    #[test]
    fn fenced_profile_parses_with_absent_keys() {
        let profile = parse_profile("```json\n{\"dominant_motivation\":\"Social\"}\n```").unwrap();
        assert_eq!(profile.dominant_motivation.as_deref(), Some("Social"));
        assert!(profile.avg_pacing.is_none());
        assert!(profile.key_mechanic.is_none());
        assert!(profile.visual_trend.is_none());
    }

    #[test]
    fn prose_answer_is_synthesis_error() {
        let err = parse_profile("Sorry, I cannot help with that.").unwrap_err();
        assert!(
            matches!(
                err,
                PipelineError::Synthesis {
                    source: SynthesisFailure::Parse(_),
                    ..
                }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn array_answer_is_synthesis_error() {
        let err = parse_profile("[1, 2, 3]").unwrap_err();
        assert!(
            matches!(
                err,
                PipelineError::Synthesis {
                    source: SynthesisFailure::Shape(_),
                    ..
                }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn synthesis_error_preview_is_truncated() {
        let long = "x".repeat(500);
        match parse_profile(&long).unwrap_err() {
            PipelineError::Synthesis { preview, .. } => assert_eq!(preview.len(), PREVIEW_CHARS),
            other => panic!("expected Synthesis, got {other:?}"),
        }
    }
}
