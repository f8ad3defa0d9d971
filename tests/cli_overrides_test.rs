use anyhow::Result;
use clap::ArgMatches;

use grafana_cli_starter::{CliBuilder, Dashboard, DashboardFlag};

fn source(_folder: &str, _matches: &ArgMatches) -> anyhow::Result<Vec<Dashboard>> {
    Ok(Vec::new())
}

fn defaults(arg: &clap::Arg) -> Vec<String> {
    arg.get_default_values()
        .iter()
        .map(|value| value.to_string_lossy().into_owned())
        .collect()
}

fn leaf<'a>(matches: &'a ArgMatches, path: &[&str]) -> &'a ArgMatches {
    path.iter().fold(matches, |current, name| {
        current.subcommand_matches(name).unwrap()
    })
}

#[test]
fn test_overridden_flags_become_optional_with_default() -> Result<()> {
    let cli = CliBuilder::new("overrides_app")
        .dashboard_source(source)
        .default_dashboard_flag(DashboardFlag::Server, "http://grafana:3000")
        .default_dashboard_flag(DashboardFlag::ApiKey, "secret")
        .default_dashboard_flag(DashboardFlag::FolderName, "team")
        .build()?;

    for action in ["apply", "destroy"] {
        let matches = cli
            .command()
            .clone()
            .try_get_matches_from(["overrides_app", "dashboard", action])?;
        let sub = leaf(&matches, &["dashboard", action]);
        assert_eq!(sub.get_one::<String>("server").map(String::as_str), Some("http://grafana:3000"));
        assert_eq!(sub.get_one::<String>("apikey").map(String::as_str), Some("secret"));
        assert_eq!(sub.get_one::<String>("foldername").map(String::as_str), Some("team"));
        assert_eq!(sub.get_one::<String>("apibasepath").map(String::as_str), Some("/api"));
    }
    Ok(())
}

#[test]
fn test_override_is_reported_as_default_on_every_declaration() -> Result<()> {
    let cli = CliBuilder::new("overrides_app")
        .default_dashboard_flag(DashboardFlag::ApiKey, "secret")
        .build()?;
    let dashboard = cli.command().find_subcommand("dashboard").unwrap();

    for action in ["apply", "destroy"] {
        let apikey = dashboard
            .find_subcommand(action)
            .unwrap()
            .get_arguments()
            .find(|arg| arg.get_id() == "apikey")
            .unwrap();
        assert_eq!(defaults(apikey), vec!["secret"]);
        assert!(!apikey.is_required_set());
    }
    Ok(())
}

#[test]
fn test_explicit_value_wins_over_override() -> Result<()> {
    let cli = CliBuilder::new("overrides_app")
        .default_dashboard_flag(DashboardFlag::FolderName, "team")
        .build()?;

    let matches = cli.command().clone().try_get_matches_from([
        "overrides_app",
        "dashboard",
        "--foldername",
        "ops",
        "plan",
    ])?;

    let plan = leaf(&matches, &["dashboard", "plan"]);
    assert_eq!(plan.get_one::<String>("foldername").map(String::as_str), Some("ops"));
    Ok(())
}

#[test]
fn test_dev_datasource_override() -> Result<()> {
    let cli = CliBuilder::new("overrides_app").default_dev_datasource("metrics").build()?;

    let run = cli
        .command()
        .find_subcommand("dev")
        .and_then(|dev| dev.find_subcommand("run"))
        .unwrap();
    let datasource = run
        .get_arguments()
        .find(|arg| arg.get_id() == "datasource_name")
        .unwrap();
    assert_eq!(defaults(datasource), vec!["metrics"]);
    assert!(!datasource.is_required_set());

    let matches = cli
        .command()
        .clone()
        .try_get_matches_from(["overrides_app", "dev", "run"])?;
    let run = leaf(&matches, &["dev", "run"]);
    assert_eq!(run.get_one::<String>("datasource_name").map(String::as_str), Some("metrics"));
    Ok(())
}

#[test]
fn test_missing_required_flag_is_a_usage_error() -> Result<()> {
    let cli = CliBuilder::new("overrides_app").build()?;

    let err = cli
        .command()
        .clone()
        .try_get_matches_from(["overrides_app", "dev", "run"])
        .unwrap_err();

    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    Ok(())
}

#[test]
fn test_double_source_registration_is_rejected() {
    let result = CliBuilder::new("overrides_app")
        .dashboard_source(source)
        .dashboard_source(source)
        .build();

    assert!(result.is_err());
}
