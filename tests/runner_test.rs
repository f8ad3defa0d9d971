use anyhow::Result;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use grafana_cli_starter::app::ports::GrafanaApiPort;
use grafana_cli_starter::config::{ApiAuth, ConnectionConfig};
use grafana_cli_starter::grafana::models::{
    AddDataSourceCommand, CreateFolderCommand, Folder, PostDashboardResponse, SaveDashboardCommand,
};
use grafana_cli_starter::runner::Runner;
use grafana_cli_starter::{CliError, Dashboard, DashboardSource};

#[derive(Default)]
struct FakeGrafana {
    folder_exists: bool,
    fail_folder_create: bool,
    fail_posts: HashSet<String>,
    fail_deletes: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeGrafana {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GrafanaApiPort for FakeGrafana {
    async fn get_folder_by_uid(&self, uid: &str) -> grafana_cli_starter::Result<Folder> {
        self.record(format!("get_folder {}", uid));
        if self.folder_exists {
            Ok(Folder {
                uid: uid.to_string(),
                title: uid.to_string(),
                ..Default::default()
            })
        } else {
            Err(CliError::Api {
                status: 404,
                body: "folder not found".to_string(),
            })
        }
    }

    async fn create_folder(&self, command: &CreateFolderCommand) -> grafana_cli_starter::Result<Folder> {
        self.record(format!("create_folder {}", command.uid));
        if self.fail_folder_create {
            return Err(CliError::Api {
                status: 403,
                body: "forbidden".to_string(),
            });
        }
        Ok(Folder {
            uid: command.uid.clone(),
            title: command.title.clone(),
            ..Default::default()
        })
    }

    async fn post_dashboard(
        &self,
        command: &SaveDashboardCommand<'_>,
    ) -> grafana_cli_starter::Result<PostDashboardResponse> {
        let uid = command.dashboard.uid.clone();
        self.record(format!("post {} folder={} overwrite={}", uid, command.folder_uid, command.overwrite));
        if self.fail_posts.contains(&uid) {
            return Err(CliError::Api {
                status: 412,
                body: format!("{} rejected", uid),
            });
        }
        Ok(PostDashboardResponse {
            uid: uid.clone(),
            url: format!("/d/{}/slug", uid),
            status: "success".to_string(),
            ..Default::default()
        })
    }

    async fn delete_dashboard_by_uid(&self, uid: &str) -> grafana_cli_starter::Result<()> {
        self.record(format!("delete {}", uid));
        if self.fail_deletes.contains(uid) {
            return Err(CliError::Api {
                status: 404,
                body: format!("{} missing", uid),
            });
        }
        Ok(())
    }

    async fn add_data_source(&self, command: &AddDataSourceCommand) -> grafana_cli_starter::Result<()> {
        self.record(format!("add_data_source {}", command.name));
        Ok(())
    }
}

fn dashboards(uids: &[&str]) -> Vec<Dashboard> {
    uids.iter()
        .map(|uid| Dashboard::new(*uid, format!("Title {}", uid)).with_field("panels", json!([])))
        .collect()
}

fn static_source(uids: &'static [&'static str]) -> Arc<dyn DashboardSource> {
    Arc::new(move |_folder: &str, _matches: &ArgMatches| -> anyhow::Result<Vec<Dashboard>> {
        Ok(dashboards(uids))
    })
}

fn matches() -> ArgMatches {
    Command::new("test").get_matches_from(["test"])
}

fn runner(fake: &Arc<FakeGrafana>, source: Arc<dyn DashboardSource>) -> Runner {
    let connection = ConnectionConfig::from_server_url(
        "http://grafana.local:3000",
        "/api",
        ApiAuth::ApiKey("key".to_string()),
    )
    .unwrap();
    Runner::with_client(source, fake.clone(), connection)
}

#[tokio::test]
async fn test_apply_creates_missing_folder_before_upserts() -> Result<()> {
    let fake = Arc::new(FakeGrafana::default());
    let runner = runner(&fake, static_source(&["a", "b"]));

    let report = runner.apply("team", &matches()).await?;

    assert!(report.folder_created);
    assert_eq!(
        fake.calls(),
        vec![
            "get_folder team",
            "create_folder team",
            "post a folder=team overwrite=true",
            "post b folder=team overwrite=true",
        ]
    );
    assert_eq!(report.dashboards[0].url, "http://grafana.local:3000/d/a/slug");
    assert_eq!(report.dashboards[1].title, "Title b");
    assert_eq!(report.summary(), "Dashboards created");
    Ok(())
}

#[tokio::test]
async fn test_apply_skips_folder_creation_when_folder_exists() -> Result<()> {
    let fake = Arc::new(FakeGrafana {
        folder_exists: true,
        ..Default::default()
    });
    let runner = runner(&fake, static_source(&["a"]));

    let report = runner.apply("team", &matches()).await?;

    assert!(!report.folder_created);
    assert!(fake.calls().iter().all(|c| !c.starts_with("create_folder")));
    assert_eq!(report.summary(), "Dashboard created");
    Ok(())
}

#[tokio::test]
async fn test_apply_fails_fast_on_first_upsert_error() {
    let fake = Arc::new(FakeGrafana {
        folder_exists: true,
        fail_posts: HashSet::from(["b".to_string()]),
        ..Default::default()
    });
    let runner = runner(&fake, static_source(&["a", "b", "c"]));

    let err = runner.apply("team", &matches()).await.unwrap_err();

    assert!(err.to_string().contains("unable to post dashboard"));
    let posts: Vec<String> = fake.calls().into_iter().filter(|c| c.starts_with("post")).collect();
    assert_eq!(posts.len(), 2);
}

#[tokio::test]
async fn test_apply_folder_creation_failure_is_fatal() {
    let fake = Arc::new(FakeGrafana {
        fail_folder_create: true,
        ..Default::default()
    });
    let runner = runner(&fake, static_source(&["a"]));

    let err = runner.apply("team", &matches()).await.unwrap_err();

    assert!(err.to_string().starts_with("apply: can not create folder team"));
    assert!(fake.calls().iter().all(|c| !c.starts_with("post")));
}

#[tokio::test]
async fn test_destroy_attempts_every_dashboard_and_joins_errors() {
    let fake = Arc::new(FakeGrafana {
        fail_deletes: HashSet::from(["a".to_string(), "c".to_string()]),
        ..Default::default()
    });
    let runner = runner(&fake, static_source(&["a", "b", "c", "d"]));

    let err = runner.destroy("team", &matches()).await.unwrap_err();

    assert_eq!(fake.calls(), vec!["delete a", "delete b", "delete c", "delete d"]);
    match &err {
        CliError::Aggregate(errors) => assert_eq!(errors.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("a missing"));
    assert!(message.contains("c missing"));
}

#[tokio::test]
async fn test_destroy_reports_deleted_count() -> Result<()> {
    let fake = Arc::new(FakeGrafana::default());
    let runner = runner(&fake, static_source(&["a", "b"]));

    assert_eq!(runner.destroy("team", &matches()).await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_plan_makes_no_calls_and_emits_pretty_json() -> Result<()> {
    let fake = Arc::new(FakeGrafana::default());
    let runner = runner(&fake, static_source(&["a", "b"]));

    let rendered = runner.plan("team", &matches())?;

    assert!(fake.calls().is_empty());
    assert_eq!(rendered.len(), 2);
    for (text, uid) in rendered.iter().zip(["a", "b"]) {
        let parsed: serde_json::Value = serde_json::from_str(text)?;
        assert_eq!(parsed["uid"], uid);
        assert!(text.contains("\n    \"title\""));
    }
    Ok(())
}

#[tokio::test]
async fn test_plan_without_client() -> Result<()> {
    let runner = Runner::new(static_source(&["only"]));
    assert_eq!(runner.plan("team", &matches())?.len(), 1);
    assert!(runner.destroy("team", &matches()).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_source_failure_aborts_before_any_call() {
    let fake = Arc::new(FakeGrafana::default());
    let failing: Arc<dyn DashboardSource> =
        Arc::new(|folder: &str, _matches: &ArgMatches| -> anyhow::Result<Vec<Dashboard>> {
            anyhow::bail!("no dashboards for {}", folder)
        });
    let runner = runner(&fake, failing);

    let err = runner.apply("team", &matches()).await.unwrap_err();

    assert!(err.to_string().contains("no dashboards for team"));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_source_receives_folder_name() -> Result<()> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_source = seen.clone();
    let source: Arc<dyn DashboardSource> =
        Arc::new(move |folder: &str, _matches: &ArgMatches| -> anyhow::Result<Vec<Dashboard>> {
            seen_by_source.lock().unwrap().push(folder.to_string());
            Ok(Vec::new())
        });
    let runner = Runner::new(source);

    runner.plan("observability", &matches())?;

    assert_eq!(*seen.lock().unwrap(), vec!["observability".to_string()]);
    Ok(())
}
