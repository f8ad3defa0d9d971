//! Command tree and dispatch.
//!
//! The tree is built from static flag tables. Embedding programs customise it
//! through [`CliBuilder`] before it is constructed: they register the
//! dashboard source and override flag defaults by key.

use clap::{Arg, ArgMatches, Command};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ApiAuth, ConnectionConfig};
use crate::constants::*;
use crate::dashboard::DashboardSource;
use crate::dev::{prometheus, DevEnvironment, DevOptions};
use crate::error::{CliError, Result};
use crate::grafana::HttpGrafanaClient;
use crate::infra::DockerRuntime;
use crate::runner::Runner;

/// Flags of the `dashboard` command tree whose default can be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DashboardFlag {
    Server,
    ApiKey,
    ApiBasePath,
    FolderName,
}

impl DashboardFlag {
    pub fn name(&self) -> &'static str {
        match self {
            DashboardFlag::Server => CLI_SERVER,
            DashboardFlag::ApiKey => CLI_API_KEY,
            DashboardFlag::ApiBasePath => CLI_API_BASE_PATH,
            DashboardFlag::FolderName => CLI_FOLDER_NAME,
        }
    }
}

struct FlagSpec {
    name: &'static str,
    alias: Option<&'static str>,
    help: &'static str,
    default: Option<&'static str>,
    required: bool,
    /// Declared on a parent command and readable from its subcommands.
    global: bool,
}

const DASHBOARD_FLAGS: &[FlagSpec] = &[FlagSpec {
    name: CLI_FOLDER_NAME,
    alias: None,
    help: "Grafana folder to create dashboards in",
    default: None,
    required: false,
    global: true,
}];

const APPLY_DESTROY_FLAGS: &[FlagSpec] = &[
    FlagSpec {
        name: CLI_SERVER,
        alias: None,
        help: "Grafana url",
        default: None,
        required: false,
        global: false,
    },
    FlagSpec {
        name: CLI_API_KEY,
        alias: None,
        help: "Grafana api key",
        default: None,
        required: true,
        global: false,
    },
    FlagSpec {
        name: CLI_API_BASE_PATH,
        alias: None,
        help: "Base path of the Grafana API",
        default: Some(DEFAULT_API_BASE_PATH),
        required: false,
        global: false,
    },
];

const DEV_RUN_FLAGS: &[FlagSpec] = &[
    FlagSpec {
        name: CLI_DEV_DATASOURCE_NAME,
        alias: Some(CLI_DEV_DATASOURCE_ALIAS),
        help: "Name and uid of the Prometheus datasource created in Grafana",
        default: None,
        required: true,
        global: false,
    },
    FlagSpec {
        name: CLI_DEV_SUBNET,
        alias: None,
        help: "Subnet of the dev network",
        default: Some(DEFAULT_DEV_SUBNET),
        required: false,
        global: false,
    },
    FlagSpec {
        name: CLI_DEV_GATEWAY,
        alias: None,
        help: "Gateway of the dev network",
        default: Some(DEFAULT_DEV_GATEWAY),
        required: false,
        global: false,
    },
];

fn build_arg(spec: &FlagSpec, app_name: &str, default_override: Option<&String>) -> Arg {
    let mut arg = Arg::new(spec.name)
        .long(spec.name)
        .help(spec.help)
        .env(flag_env_name(spec.name, app_name))
        .global(spec.global);
    if let Some(alias) = spec.alias {
        arg = arg.visible_alias(alias);
    }

    match (default_override, spec.default) {
        (Some(value), _) => arg.default_value(value.clone()).required(false),
        (None, Some(value)) => arg.default_value(value).required(spec.required),
        (None, None) => arg.required(spec.required),
    }
}

fn build_args(specs: &[FlagSpec], app_name: &str, overrides: &BTreeMap<&'static str, String>) -> Vec<Arg> {
    specs
        .iter()
        .map(|spec| build_arg(spec, app_name, overrides.get(spec.name)))
        .collect()
}

/// Collects everything that customises the command tree, then builds it once.
pub struct CliBuilder {
    app_name: String,
    source: Option<Arc<dyn DashboardSource>>,
    source_registrations: usize,
    dashboard_defaults: BTreeMap<DashboardFlag, String>,
    dev_datasource_default: Option<String>,
}

impl CliBuilder {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            source: None,
            source_registrations: 0,
            dashboard_defaults: BTreeMap::new(),
            dev_datasource_default: None,
        }
    }

    /// Register the callback producing dashboards. Registering twice makes `build` fail.
    pub fn dashboard_source<S>(mut self, source: S) -> Self
    where
        S: DashboardSource + 'static,
    {
        self.source_registrations += 1;
        if self.source.is_none() {
            self.source = Some(Arc::new(source));
        }
        self
    }

    /// Default value for a flag of `dashboard` and its subcommands. The flag is no longer required.
    pub fn default_dashboard_flag(mut self, flag: DashboardFlag, value: impl Into<String>) -> Self {
        self.dashboard_defaults.insert(flag, value.into());
        self
    }

    /// Default datasource name for `dev run`. The flag is no longer required.
    pub fn default_dev_datasource(mut self, value: impl Into<String>) -> Self {
        self.dev_datasource_default = Some(value.into());
        self
    }

    pub fn build(self) -> Result<Cli> {
        if self.source_registrations > 1 {
            return Err(CliError::Config("dashboard source already set".to_string()));
        }
        if self.app_name.trim().is_empty() {
            return Err(CliError::Config("app name must not be empty".to_string()));
        }

        let dashboard_overrides: BTreeMap<&'static str, String> = self
            .dashboard_defaults
            .iter()
            .map(|(flag, value)| (flag.name(), value.clone()))
            .collect();
        let mut dev_overrides = BTreeMap::new();
        if let Some(value) = &self.dev_datasource_default {
            dev_overrides.insert(CLI_DEV_DATASOURCE_NAME, value.clone());
        }

        let command = build_command(&self.app_name, &dashboard_overrides, &dev_overrides);
        Ok(Cli {
            app_name: self.app_name,
            command,
            source: self.source,
        })
    }
}

fn build_command(
    app_name: &str,
    dashboard_overrides: &BTreeMap<&'static str, String>,
    dev_overrides: &BTreeMap<&'static str, String>,
) -> Command {
    let apply_destroy_args = build_args(APPLY_DESTROY_FLAGS, app_name, dashboard_overrides);

    let dashboard = Command::new("dashboard")
        .about("To apply destroy and plan current dashboard")
        .subcommand_required(true)
        .args(build_args(DASHBOARD_FLAGS, app_name, dashboard_overrides))
        .subcommand(
            Command::new("apply")
                .about("Upload dashboards to target configuration")
                .args(apply_destroy_args.clone()),
        )
        .subcommand(
            Command::new("destroy")
                .about("Remove dashboards from target configuration")
                .args(apply_destroy_args),
        )
        .subcommand(Command::new("plan").about("Print the dashboards that would be uploaded"));

    let dev = Command::new("dev")
        .about("Local Prometheus and Grafana for dashboard development")
        .subcommand_required(true)
        .subcommand(Command::new("init").about(
            "Generate template prometheus folder/file to configure scrape targets for the local dev server \
             (do not move these files and start the dev server from the same path)",
        ))
        .subcommand(
            Command::new("run")
                .about("Start dev prometheus and grafana")
                .args(build_args(DEV_RUN_FLAGS, app_name, dev_overrides)),
        );

    Command::new(app_name.to_string())
        .about(format!("{}-grafana sdk cli", app_name))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(dashboard)
        .subcommand(dev)
}

fn string_arg(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.try_get_one::<String>(name).ok().flatten().cloned()
}

fn required_arg(matches: &ArgMatches, name: &str) -> Result<String> {
    string_arg(matches, name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CliError::Config(format!("--{} must be set", name)))
}

/// The constructed command tree plus what it dispatches to.
pub struct Cli {
    app_name: String,
    command: Command,
    source: Option<Arc<dyn DashboardSource>>,
}

impl Cli {
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Parse `args` (including the program name) and run the selected command.
    pub async fn run<I, T>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().try_get_matches_from(args)?;
        self.dispatch(&matches, shutdown_signal()).await
    }

    /// Run the command selected by `matches`. `shutdown` ends a `dev run` session.
    pub async fn dispatch<S>(&self, matches: &ArgMatches, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        match matches.subcommand() {
            Some(("dashboard", dashboard)) => self.dashboard(dashboard).await,
            Some(("dev", dev)) => self.dev(dev, shutdown).await,
            _ => Err(CliError::Config("no command given".to_string())),
        }
    }

    fn source(&self) -> Result<Arc<dyn DashboardSource>> {
        self.source
            .clone()
            .ok_or_else(|| CliError::Config("no dashboard source registered".to_string()))
    }

    /// Build the authenticated client from the apply/destroy flags.
    fn connected_runner(&self, matches: &ArgMatches) -> Result<Runner> {
        let server = required_arg(matches, CLI_SERVER)?;
        let base_path =
            string_arg(matches, CLI_API_BASE_PATH).unwrap_or_else(|| DEFAULT_API_BASE_PATH.to_string());
        let api_key = required_arg(matches, CLI_API_KEY)?;

        let connection = ConnectionConfig::from_server_url(&server, &base_path, ApiAuth::ApiKey(api_key))?;
        let client = HttpGrafanaClient::new(connection.clone())?;
        Ok(Runner::with_client(self.source()?, Arc::new(client), connection))
    }

    async fn dashboard(&self, matches: &ArgMatches) -> Result<()> {
        match matches.subcommand() {
            Some(("apply", sub)) => {
                let runner = self.connected_runner(sub)?;
                let folder = required_arg(sub, CLI_FOLDER_NAME)?;
                let report = runner.apply(&folder, sub).await?;
                for dashboard in &report.dashboards {
                    println!("{}: {}", dashboard.title, dashboard.url);
                }
                println!("{}", report.summary());
            }
            Some(("plan", sub)) => {
                let runner = Runner::new(self.source()?);
                let folder = required_arg(sub, CLI_FOLDER_NAME)?;
                for rendered in runner.plan(&folder, sub)? {
                    println!("{}", rendered);
                }
            }
            Some(("destroy", sub)) => {
                let runner = self.connected_runner(sub)?;
                let folder = required_arg(sub, CLI_FOLDER_NAME)?;
                let deleted = runner.destroy(&folder, sub).await?;
                info!(deleted, "dashboards destroyed");
                println!("Destroyed");
            }
            _ => return Err(CliError::Config("unknown dashboard command".to_string())),
        }
        Ok(())
    }

    async fn dev<S>(&self, matches: &ArgMatches, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let workdir = std::env::current_dir()?;
        match matches.subcommand() {
            Some(("init", _)) => {
                let file = prometheus::init_config(&workdir)?;
                println!("Prometheus config: {}", file.display());
                Ok(())
            }
            Some(("run", sub)) => {
                let options = dev_options(&self.app_name, sub, workdir)?;
                let runtime = DockerRuntime::connect()?;
                DevEnvironment::new(Arc::new(runtime), options).run(shutdown).await?;
                Ok(())
            }
            _ => Err(CliError::Config("unknown dev command".to_string())),
        }
    }
}

fn dev_options(app_name: &str, matches: &ArgMatches, workdir: PathBuf) -> Result<DevOptions> {
    Ok(DevOptions {
        program: app_name.to_string(),
        datasource_name: required_arg(matches, CLI_DEV_DATASOURCE_NAME)?,
        subnet: string_arg(matches, CLI_DEV_SUBNET).unwrap_or_else(|| DEFAULT_DEV_SUBNET.to_string()),
        gateway: string_arg(matches, CLI_DEV_GATEWAY).unwrap_or_else(|| DEFAULT_DEV_GATEWAY.to_string()),
        workdir,
    })
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received interrupt"),
        _ = terminate => info!("received terminate"),
    }
}
