//! Command handlers. Results go to stdout; logs go to stderr.

use std::path::Path;

use anyhow::Context as _;
use dnalens_core::{AppConfig, CreativeRef, ProfileStore, WinningDna};
use dnalens_gemini::GeminiClient;
use dnalens_pipeline::{analyze_creative, build_prompt, get_winning_dna};

fn build_client(config: &AppConfig) -> anyhow::Result<GeminiClient> {
    let api_key = config
        .require_api_key()
        .context("GEMINI_API_KEY is not set; cannot call the generation service")?;
    GeminiClient::from_config(api_key, config)
        .map_err(|e| anyhow::anyhow!("failed to build Gemini client: {e}"))
}

/// Loads the persisted profile, failing with a hint when there is none.
pub(crate) fn require_profile(store: &ProfileStore) -> anyhow::Result<WinningDna> {
    store.load()?.ok_or_else(|| {
        anyhow::anyhow!(
            "no Winning DNA at {}; run `dnalens synthesize <CSV>` first",
            store.path().display()
        )
    })
}

async fn synthesize_and_save(
    client: &GeminiClient,
    config: &AppConfig,
    dataset: &Path,
    top_n: usize,
) -> anyhow::Result<WinningDna> {
    let profile = get_winning_dna(client, dataset, top_n).await?;
    ProfileStore::new(&config.profile_path).save(&profile)?;
    Ok(profile)
}

/// Runs a synthesis over `dataset`, persists it and prints it.
///
/// # Errors
///
/// Returns an error if the API key is missing, the dataset is unusable, the
/// synthesis fails or the profile cannot be saved.
pub(crate) async fn run_synthesize(
    config: &AppConfig,
    dataset: &Path,
    top_n: Option<usize>,
) -> anyhow::Result<()> {
    let top_n = top_n.unwrap_or(config.top_n);
    anyhow::ensure!(top_n > 0, "--top-n must be at least 1");
    let client = build_client(config)?;
    let profile = synthesize_and_save(&client, config, dataset, top_n).await?;
    println!("{}", profile.to_pretty_json());
    Ok(())
}

pub(crate) fn run_profile(config: &AppConfig) -> anyhow::Result<()> {
    let profile = require_profile(&ProfileStore::new(&config.profile_path))?;
    println!("{}", profile.to_pretty_json());
    Ok(())
}

pub(crate) fn run_prompt(config: &AppConfig) -> anyhow::Result<()> {
    let profile = require_profile(&ProfileStore::new(&config.profile_path))?;
    println!("{}", build_prompt(&profile));
    Ok(())
}

/// Scores one creative. With `dataset`, a fresh profile is synthesized and
/// persisted first; otherwise the persisted profile is used.
///
/// # Errors
///
/// Returns an error if the creative reference is blank, the API key is
/// missing, there is no profile, or any service call fails.
pub(crate) async fn run_report(
    config: &AppConfig,
    creative: &str,
    dataset: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let creative = CreativeRef::parse(creative).context("creative path or URL is empty")?;
    let client = build_client(config)?;

    let profile = match dataset {
        Some(path) => Some(synthesize_and_save(&client, config, path, config.top_n).await?),
        None => ProfileStore::new(&config.profile_path).load()?,
    };

    let report = analyze_creative(&client, &creative, profile.as_ref()).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.report);
    }
    Ok(())
}
