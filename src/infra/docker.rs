//! Docker implementation of the container runtime port.

use async_trait::async_trait;
use bollard::models::{
    ContainerCreateBody, HostConfig, Ipam, IpamConfig, Mount, MountTypeEnum, NetworkCreateRequest,
};
use bollard::query_parameters::{
    CreateContainerOptionsBuilder, CreateImageOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::Docker;
use futures::TryStreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::app::ports::{ContainerHandle, ContainerRuntimePort, ContainerSpec, NetworkSpec, ReadinessProbe};
use crate::error::{CliError, Result};

const DEFAULT_READY_ATTEMPTS: u32 = 120;
const DEFAULT_READY_INTERVAL: Duration = Duration::from_millis(500);

pub struct DockerRuntime {
    docker: Docker,
    host: String,
    http: reqwest::Client,
    ready_attempts: u32,
    ready_interval: Duration,
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform's default socket.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self::new(docker, published_host()))
    }

    pub fn new(docker: Docker, host: String) -> Self {
        Self {
            docker,
            host,
            http: reqwest::Client::new(),
            ready_attempts: DEFAULT_READY_ATTEMPTS,
            ready_interval: DEFAULT_READY_INTERVAL,
        }
    }

    pub fn with_readiness(mut self, attempts: u32, interval: Duration) -> Self {
        self.ready_attempts = attempts;
        self.ready_interval = interval;
        self
    }

    async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.docker.inspect_image(image).await.is_ok() {
            debug!(image, "image present locally");
            return Ok(());
        }

        info!(image, "pulling image");
        self.docker
            .create_image(
                Some(CreateImageOptions {
                    from_image: Some(image.to_string()),
                    ..Default::default()
                }),
                None,
                None,
            )
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| CliError::Container(format!("Failed to pull image {}: {}", image, e)))?;
        Ok(())
    }

    async fn published_port(&self, container_id: &str, port: u16) -> Result<u16> {
        let inspected = self
            .docker
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await?;
        let key = format!("{}/tcp", port);

        inspected
            .network_settings
            .and_then(|settings| settings.ports)
            .and_then(|ports| ports.get(&key).cloned().flatten())
            .and_then(|bindings| {
                bindings
                    .into_iter()
                    .find_map(|binding| binding.host_port.and_then(|p| p.parse::<u16>().ok()))
            })
            .ok_or_else(|| CliError::Container(format!("port {} of {} is not published", key, container_id)))
    }

    async fn probe(&self, handle: &ContainerHandle, probe: &ReadinessProbe) -> bool {
        match probe {
            ReadinessProbe::ListeningPort => {
                tokio::net::TcpStream::connect((handle.host.as_str(), handle.host_port))
                    .await
                    .is_ok()
            }
            ReadinessProbe::Http { path } => {
                let url = format!("{}{}", handle.endpoint("http"), path);
                matches!(self.http.get(&url).send().await, Ok(resp) if resp.status().is_success())
            }
        }
    }
}

/// Host on which published container ports are reachable.
fn published_host() -> String {
    std::env::var("DOCKER_HOST")
        .ok()
        .filter(|host| host.starts_with("tcp://"))
        .and_then(|host| url::Url::parse(&host).ok())
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string())
}

#[async_trait]
impl ContainerRuntimePort for DockerRuntime {
    async fn create_network(&self, spec: &NetworkSpec) -> Result<String> {
        let request = NetworkCreateRequest {
            name: spec.name.clone(),
            driver: Some("bridge".to_string()),
            ipam: Some(Ipam {
                driver: Some("default".to_string()),
                config: Some(vec![IpamConfig {
                    subnet: Some(spec.subnet.clone()),
                    gateway: Some(spec.gateway.clone()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        self.docker
            .create_network(request)
            .await
            .map_err(|e| CliError::Container(format!("Failed to create network: {}", e)))?;
        Ok(spec.name.clone())
    }

    async fn remove_network(&self, id: &str) -> Result<()> {
        self.docker
            .remove_network(id)
            .await
            .map_err(|e| CliError::Container(format!("Failed to remove network {}: {}", id, e)))
    }

    async fn start_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle> {
        self.ensure_image(&spec.image).await?;

        let port_key = format!("{}/tcp", spec.port);
        let mut exposed_ports = HashMap::new();
        exposed_ports.insert(port_key, HashMap::new());

        let mounts: Vec<Mount> = spec
            .mounts
            .iter()
            .map(|m| Mount {
                source: Some(m.source.clone()),
                target: Some(m.target.clone()),
                typ: Some(MountTypeEnum::BIND),
                ..Default::default()
            })
            .collect();

        let host_config = HostConfig {
            network_mode: Some(spec.network.clone()),
            publish_all_ports: Some(true),
            privileged: Some(spec.privileged),
            mounts: Some(mounts),
            ..Default::default()
        };

        let body = ContainerCreateBody {
            image: Some(spec.image.clone()),
            cmd: (!spec.cmd.is_empty()).then(|| spec.cmd.clone()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let container = self
            .docker
            .create_container(
                Some(CreateContainerOptionsBuilder::new().name(&spec.name).build()),
                body,
            )
            .await
            .map_err(|e| CliError::Container(format!("Failed to create container {}: {}", spec.name, e)))?;

        let started = self
            .docker
            .start_container(&container.id, None::<StartContainerOptions>)
            .await
            .map_err(|e| CliError::Container(format!("Failed to start container {}: {}", spec.name, e)));
        let host_port = match started {
            Ok(()) => self.published_port(&container.id, spec.port).await,
            Err(e) => Err(e),
        };

        match host_port {
            Ok(host_port) => Ok(ContainerHandle {
                id: container.id,
                name: spec.name.clone(),
                host: self.host.clone(),
                host_port,
            }),
            Err(e) => {
                // Never hand out a half-started container
                if let Err(cleanup) = self
                    .docker
                    .remove_container(
                        &container.id,
                        Some(RemoveContainerOptions {
                            force: true,
                            ..Default::default()
                        }),
                    )
                    .await
                {
                    warn!(container = %spec.name, error = %cleanup, "failed to remove container after start failure");
                }
                Err(e)
            }
        }
    }

    async fn wait_until_ready(&self, handle: &ContainerHandle, probe: &ReadinessProbe) -> Result<()> {
        for attempt in 1..=self.ready_attempts {
            if self.probe(handle, probe).await {
                debug!(container = %handle.name, attempt, "container ready");
                return Ok(());
            }
            tokio::time::sleep(self.ready_interval).await;
        }

        Err(CliError::NotReady {
            service: handle.name.clone(),
            port: handle.host_port,
            attempts: self.ready_attempts,
        })
    }

    async fn terminate_container(&self, handle: &ContainerHandle) -> Result<()> {
        if let Err(e) = self
            .docker
            .stop_container(&handle.id, None::<StopContainerOptions>)
            .await
        {
            debug!(container = %handle.name, error = %e, "stop failed, forcing removal");
        }

        self.docker
            .remove_container(
                &handle.id,
                Some(RemoveContainerOptions {
                    force: true,
                    v: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| CliError::Container(format!("Failed to remove container {}: {}", handle.name, e)))
    }
}
