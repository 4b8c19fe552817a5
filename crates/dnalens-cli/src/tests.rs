use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["dnalens"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_synthesize_with_dataset() {
    let cli = Cli::try_parse_from(["dnalens", "synthesize", "market.csv"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Synthesize { ref dataset, top_n: None }) if dataset.to_str() == Some("market.csv")
    ));
}

#[test]
fn parses_synthesize_top_n_override() {
    let cli = Cli::try_parse_from(["dnalens", "synthesize", "market.csv", "--top-n", "3"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Synthesize { top_n: Some(3), .. })
    ));
}

#[test]
fn synthesize_requires_dataset() {
    assert!(Cli::try_parse_from(["dnalens", "synthesize"]).is_err());
}

#[test]
fn parses_profile_and_prompt() {
    let cli = Cli::try_parse_from(["dnalens", "profile"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Profile)));

    let cli = Cli::try_parse_from(["dnalens", "prompt"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Prompt)));
}

#[test]
fn parses_report_with_url() {
    let cli = Cli::try_parse_from(["dnalens", "report", "https://cdn.example/ad.mp4"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Report { ref creative, dataset: None, json: false })
            if creative == "https://cdn.example/ad.mp4"
    ));
}

#[test]
fn parses_report_with_dataset_and_json() {
    let cli = Cli::try_parse_from([
        "dnalens",
        "report",
        "ad.mp4",
        "--dataset",
        "market.csv",
        "--json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Report { dataset: Some(ref d), json: true, .. }) if d.to_str() == Some("market.csv")
    ));
}

#[test]
fn missing_profile_error_names_the_fix() {
    let dir = tempfile::tempdir().unwrap();
    let store = dnalens_core::ProfileStore::new(dir.path().join("dna.json"));
    let err = commands::require_profile(&store).unwrap_err();
    assert!(err.to_string().contains("dnalens synthesize"), "{err}");
}

#[test]
fn saved_profile_is_returned() {
    let dir = tempfile::tempdir().unwrap();
    let store = dnalens_core::ProfileStore::new(dir.path().join("dna.json"));
    let profile = dnalens_core::WinningDna {
        visual_trend: Some("Neon".to_string()),
        ..dnalens_core::WinningDna::default()
    };
    store.save(&profile).unwrap();
    assert_eq!(commands::require_profile(&store).unwrap(), profile);
}
