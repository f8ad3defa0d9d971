//! Local Prometheus + Grafana environment for developing dashboards.

pub mod prometheus;
pub mod teardown;

use std::fmt;
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::ports::{
    BindMount, ContainerHandle, ContainerRuntimePort, ContainerSpec, GrafanaApiPort, NetworkSpec,
    ReadinessProbe,
};
use crate::config::{ApiAuth, ConnectionConfig, Credentials};
use crate::constants::{
    DEFAULT_API_BASE_PATH, DEV_SERVICE_ACCOUNT, DEV_TOKEN_NAME, GRAFANA_ADMIN_PASSWORD, GRAFANA_ADMIN_USER,
    GRAFANA_IMAGE, GRAFANA_PORT, PROMETHEUS_CONFIG_MOUNT, PROMETHEUS_IMAGE, PROMETHEUS_PORT,
};
use crate::error::{CliError, Result};
use crate::grafana::models::AddDataSourceCommand;
use crate::grafana::{HttpGrafanaClient, ServiceAccountProvisioner};
use teardown::{DevResource, TeardownStack};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevOptions {
    /// Program name used in the printed example command.
    pub program: String,
    pub datasource_name: String,
    pub subnet: String,
    pub gateway: String,
    /// Directory holding `prometheus/prometheus.yml`.
    pub workdir: PathBuf,
}

/// Connection details of a running dev environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevSession {
    pub program: String,
    pub network: String,
    pub prometheus_url: String,
    pub grafana_url: String,
    pub datasource_name: String,
    pub api_key: String,
}

impl fmt::Display for DevSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Prometheus endpoint: {}", self.prometheus_url)?;
        writeln!(f, "\tReload Config: curl -s -XPOST {}/-/reload", self.prometheus_url)?;
        writeln!(f, "Grafana endpoint: {}", self.grafana_url)?;
        writeln!(f, "\tGrafana user: {}", GRAFANA_ADMIN_USER)?;
        writeln!(f, "\tGrafana password: {}", GRAFANA_ADMIN_PASSWORD)?;
        writeln!(f, "\tPrometheus Datasourcename: {}", self.datasource_name)?;
        writeln!(f, "\tApi key: {}", self.api_key)?;
        writeln!(f, "Simple run")?;
        write!(
            f,
            " {} dashboard apply --server {} --apikey {}",
            self.program, self.grafana_url, self.api_key
        )
    }
}

pub struct DevEnvironment {
    runtime: Arc<dyn ContainerRuntimePort>,
    options: DevOptions,
}

impl DevEnvironment {
    pub fn new(runtime: Arc<dyn ContainerRuntimePort>, options: DevOptions) -> Self {
        Self { runtime, options }
    }

    /// Provision the environment, print its endpoints and wait for `shutdown`,
    /// then release everything in reverse order of creation.
    ///
    /// Resolving `shutdown` during provisioning aborts it once the step in
    /// progress has settled; whatever was already created is still released.
    pub async fn run<S>(&self, shutdown: S) -> Result<DevSession>
    where
        S: Future<Output = ()>,
    {
        prometheus::init_config(&self.options.workdir)?;

        let mut shutdown = Shutdown::new(shutdown);
        let mut teardown = TeardownStack::new();

        let outcome = match self.provision(&mut teardown, &mut shutdown).await {
            Ok(session) => {
                println!("{}", session);
                info!("dev environment ready, waiting for interrupt");
                shutdown.wait().await;
                info!("shutting down dev environment");
                Ok(session)
            }
            Err(e) => {
                error!(error = %e, "dev environment setup failed");
                Err(e)
            }
        };

        let released = teardown.release_all(self.runtime.as_ref()).await;
        match (outcome, released) {
            (Ok(session), Ok(())) => Ok(session),
            (Ok(_), Err(teardown_err)) => Err(teardown_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown_err)) => {
                warn!(error = %teardown_err, "cleanup after failed setup was incomplete");
                Err(e)
            }
        }
    }

    async fn provision<S>(&self, teardown: &mut TeardownStack, shutdown: &mut Shutdown<S>) -> Result<DevSession>
    where
        S: Future<Output = ()>,
    {
        let session_id = Uuid::new_v4();
        let config_dir = fs::canonicalize(prometheus::config_dir(&self.options.workdir))?;

        let network_name = format!("grafana_dev_{}", session_id);
        let network_spec = NetworkSpec {
            name: network_name.clone(),
            subnet: self.options.subnet.clone(),
            gateway: self.options.gateway.clone(),
        };
        let network_id = shutdown
            .complete(self.runtime.create_network(&network_spec))
            .await
            .map_err(|e| e.context("error create network"))?;
        teardown.push(DevResource::Network {
            id: network_id,
            name: network_name.clone(),
        });
        info!(network = %network_name, subnet = %self.options.subnet, "network created");
        shutdown.check()?;

        let prometheus_name = format!("prometheus_{}", session_id);
        let prometheus = self
            .start(
                &ContainerSpec {
                    name: prometheus_name.clone(),
                    image: PROMETHEUS_IMAGE.to_string(),
                    cmd: vec![
                        "--config.file=/etc/prometheus/prometheus.yml".to_string(),
                        "--storage.tsdb.path=/prometheus".to_string(),
                        "--web.console.libraries=/usr/share/prometheus/console_libraries".to_string(),
                        "--web.console.templates=/usr/share/prometheus/consoles".to_string(),
                        "--web.enable-lifecycle".to_string(),
                    ],
                    port: PROMETHEUS_PORT,
                    network: network_name.clone(),
                    mounts: vec![BindMount {
                        source: config_dir.display().to_string(),
                        target: PROMETHEUS_CONFIG_MOUNT.to_string(),
                    }],
                    privileged: true,
                    readiness: ReadinessProbe::Http {
                        path: "/-/ready".to_string(),
                    },
                },
                teardown,
                shutdown,
            )
            .await
            .map_err(|e| e.context("error start prometheus"))?;

        let grafana = self
            .start(
                &ContainerSpec {
                    name: format!("grafana_{}", session_id),
                    image: GRAFANA_IMAGE.to_string(),
                    cmd: Vec::new(),
                    port: GRAFANA_PORT,
                    network: network_name.clone(),
                    mounts: Vec::new(),
                    privileged: false,
                    readiness: ReadinessProbe::Http {
                        path: "/api/health".to_string(),
                    },
                },
                teardown,
                shutdown,
            )
            .await
            .map_err(|e| e.context("error start grafana"))?;

        let grafana_url = grafana.endpoint("http");
        let prometheus_url = prometheus.endpoint("http");
        let admin = Credentials::new(GRAFANA_ADMIN_USER, GRAFANA_ADMIN_PASSWORD);

        let client = HttpGrafanaClient::new(ConnectionConfig {
            host: format!("{}:{}", grafana.host, grafana.host_port),
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            schemes: vec!["http".to_string()],
            auth: ApiAuth::Basic(admin.clone()),
        })?;
        // Containers on the same network resolve each other by name
        let datasource_url = format!("http://{}:{}", prometheus_name, PROMETHEUS_PORT);
        let datasource = AddDataSourceCommand::prometheus(&self.options.datasource_name, &datasource_url);
        shutdown
            .cancellable(client.add_data_source(&datasource))
            .await
            .map_err(|e| e.context("error create prometheus datasource at grafana"))?;
        info!(datasource = %self.options.datasource_name, url = %datasource_url, "datasource registered");

        let provisioner = ServiceAccountProvisioner::new(grafana_url.clone(), admin)?;
        let api_key = shutdown
            .cancellable(provisioner.create_api_key(DEV_SERVICE_ACCOUNT, DEV_TOKEN_NAME))
            .await
            .map_err(|e| e.context("error create grafana apikey"))?;

        Ok(DevSession {
            program: self.options.program.clone(),
            network: network_name,
            prometheus_url,
            grafana_url,
            datasource_name: self.options.datasource_name.clone(),
            api_key,
        })
    }

    /// Start a container and register it for teardown before waiting on it.
    async fn start<S>(
        &self,
        spec: &ContainerSpec,
        teardown: &mut TeardownStack,
        shutdown: &mut Shutdown<S>,
    ) -> Result<ContainerHandle>
    where
        S: Future<Output = ()>,
    {
        let handle = shutdown.complete(self.runtime.start_container(spec)).await?;
        teardown.push(DevResource::Container(handle.clone()));
        info!(container = %handle.name, image = %spec.image, host_port = handle.host_port, "container started");
        shutdown.check()?;
        shutdown
            .cancellable(self.runtime.wait_until_ready(&handle, &spec.readiness))
            .await?;
        Ok(handle)
    }
}

/// Shutdown signal observed between provisioning steps.
///
/// Steps that create resources run to completion so their handle always
/// reaches the teardown stack; waits and Grafana calls are abandoned.
struct Shutdown<S> {
    signal: Pin<Box<S>>,
    fired: bool,
}

impl<S> Shutdown<S>
where
    S: Future<Output = ()>,
{
    fn new(signal: S) -> Self {
        Self {
            signal: Box::pin(signal),
            fired: false,
        }
    }

    fn check(&self) -> Result<()> {
        if self.fired {
            Err(CliError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Drive `step` to completion, remembering a signal that arrives meanwhile.
    async fn complete<T>(&mut self, step: impl Future<Output = T>) -> T {
        if self.fired {
            return step.await;
        }
        tokio::pin!(step);
        tokio::select! {
            biased;
            output = &mut step => output,
            _ = self.signal.as_mut() => {
                self.fired = true;
                info!("interrupt received, finishing current step");
                step.await
            }
        }
    }

    /// Drive `step` unless the signal arrives first.
    async fn cancellable<T>(&mut self, step: impl Future<Output = Result<T>>) -> Result<T> {
        self.check()?;
        tokio::select! {
            biased;
            output = step => output,
            _ = self.signal.as_mut() => {
                self.fired = true;
                Err(CliError::Interrupted)
            }
        }
    }

    async fn wait(&mut self) {
        if !self.fired {
            self.signal.as_mut().await;
            self.fired = true;
        }
    }
}
