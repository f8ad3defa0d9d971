//! apply / plan / destroy against a Grafana instance.

use clap::ArgMatches;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::app::ports::GrafanaApiPort;
use crate::config::ConnectionConfig;
use crate::dashboard::{Dashboard, DashboardSource};
use crate::error::{CliError, Result};
use crate::grafana::models::{CreateFolderCommand, SaveDashboardCommand};

/// What to do when the operation fails for one dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure and return it.
    FailFast,
    /// Attempt every dashboard, then return all failures joined together.
    CollectAll,
}

/// Run `op` for each dashboard in order under the given failure policy.
pub async fn for_each_dashboard<'a, T, F, Fut>(
    dashboards: &'a [Dashboard],
    policy: FailurePolicy,
    mut op: F,
) -> Result<Vec<T>>
where
    F: FnMut(&'a Dashboard) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut results = Vec::with_capacity(dashboards.len());
    let mut errors = Vec::new();

    for dashboard in dashboards {
        match op(dashboard).await {
            Ok(value) => results.push(value),
            Err(e) => match policy {
                FailurePolicy::FailFast => return Err(e),
                FailurePolicy::CollectAll => {
                    warn!(uid = %dashboard.uid, error = %e, "dashboard operation failed");
                    errors.push(e);
                }
            },
        }
    }

    if errors.is_empty() {
        Ok(results)
    } else {
        Err(CliError::Aggregate(errors))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDashboard {
    pub title: String,
    pub uid: String,
    /// Absolute URL of the dashboard in Grafana.
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub folder_created: bool,
    pub dashboards: Vec<AppliedDashboard>,
}

impl ApplyReport {
    pub fn summary(&self) -> &'static str {
        if self.dashboards.len() > 1 {
            "Dashboards created"
        } else {
            "Dashboard created"
        }
    }
}

/// Holds the dashboard source and, for commands that talk to Grafana, an API client.
pub struct Runner {
    source: Arc<dyn DashboardSource>,
    client: Option<(Arc<dyn GrafanaApiPort>, ConnectionConfig)>,
}

impl Runner {
    /// Runner without a Grafana client; only `plan` is usable.
    pub fn new(source: Arc<dyn DashboardSource>) -> Self {
        Self { source, client: None }
    }

    pub fn with_client(
        source: Arc<dyn DashboardSource>,
        client: Arc<dyn GrafanaApiPort>,
        connection: ConnectionConfig,
    ) -> Self {
        Self {
            source,
            client: Some((client, connection)),
        }
    }

    fn client(&self) -> Result<(&dyn GrafanaApiPort, &ConnectionConfig)> {
        self.client
            .as_ref()
            .map(|(client, connection)| (client.as_ref(), connection))
            .ok_or_else(|| CliError::Config("no Grafana client configured".to_string()))
    }

    fn dashboards(&self, folder_name: &str, matches: &ArgMatches) -> Result<Vec<Dashboard>> {
        let dashboards = self
            .source
            .dashboards(folder_name, matches)
            .map_err(CliError::DashboardSource)?;
        debug!(folder = folder_name, count = dashboards.len(), "dashboards loaded");
        Ok(dashboards)
    }

    /// Ensure the folder exists, then create or overwrite every dashboard in it.
    pub async fn apply(&self, folder_name: &str, matches: &ArgMatches) -> Result<ApplyReport> {
        let (client, connection) = self.client()?;
        let dashboards = self
            .dashboards(folder_name, matches)
            .map_err(|e| e.context("failed apply dashboard"))?;

        let mut folder_created = false;
        if let Err(lookup) = client.get_folder_by_uid(folder_name).await {
            debug!(folder = folder_name, error = %lookup, "folder lookup failed, creating it");
            client
                .create_folder(&CreateFolderCommand::named(folder_name))
                .await
                .map_err(|e| e.context(format!("apply: can not create folder {}", folder_name)))?;
            info!(folder = folder_name, "folder created");
            folder_created = true;
        }

        let applied = for_each_dashboard(&dashboards, FailurePolicy::FailFast, |dashboard| async move {
            let response = client
                .post_dashboard(&SaveDashboardCommand {
                    dashboard,
                    folder_uid: folder_name,
                    overwrite: true,
                    message: None,
                })
                .await
                .map_err(|e| e.context("unable to post dashboard"))?;
            info!(uid = %dashboard.uid, version = ?response.version, "dashboard applied");
            Ok(AppliedDashboard {
                title: dashboard.title.clone(),
                uid: dashboard.uid.clone(),
                url: format!("{}{}", connection.origin(), response.url),
            })
        })
        .await?;

        Ok(ApplyReport {
            folder_created,
            dashboards: applied,
        })
    }

    /// Render every dashboard as pretty JSON without contacting Grafana.
    pub fn plan(&self, folder_name: &str, matches: &ArgMatches) -> Result<Vec<String>> {
        let dashboards = self
            .dashboards(folder_name, matches)
            .map_err(|e| e.context("failed plan"))?;
        dashboards.iter().map(to_pretty_json).collect()
    }

    /// Delete every dashboard by uid, attempting all of them before reporting failures.
    pub async fn destroy(&self, folder_name: &str, matches: &ArgMatches) -> Result<usize> {
        let (client, _) = self.client()?;
        let dashboards = self
            .dashboards(folder_name, matches)
            .map_err(|e| e.context("failed destroy"))?;

        let deleted = for_each_dashboard(&dashboards, FailurePolicy::CollectAll, |dashboard| async move {
            if dashboard.uid.is_empty() {
                return Err(CliError::Config(format!("dashboard {} has no uid", dashboard.title)));
            }
            client
                .delete_dashboard_by_uid(&dashboard.uid)
                .await
                .map_err(|e| e.context(format!("unable to delete dashboard {}", dashboard.uid)))?;
            info!(uid = %dashboard.uid, "dashboard deleted");
            Ok(())
        })
        .await?;

        Ok(deleted.len())
    }
}

fn to_pretty_json(dashboard: &Dashboard) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    dashboard
        .serialize(&mut serializer)
        .map_err(|e| CliError::from(e).context("unable to marshal"))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
