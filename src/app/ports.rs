use async_trait::async_trait;

use crate::error::Result;
use crate::grafana::models::{
    AddDataSourceCommand, CreateFolderCommand, Folder, PostDashboardResponse, SaveDashboardCommand,
};

// Grafana-side ports
#[async_trait]
pub trait GrafanaApiPort: Send + Sync {
    async fn get_folder_by_uid(&self, uid: &str) -> Result<Folder>;
    async fn create_folder(&self, command: &CreateFolderCommand) -> Result<Folder>;
    /// Create or update a dashboard, depending on `overwrite`.
    async fn post_dashboard(&self, command: &SaveDashboardCommand<'_>) -> Result<PostDashboardResponse>;
    async fn delete_dashboard_by_uid(&self, uid: &str) -> Result<()>;
    async fn add_data_source(&self, command: &AddDataSourceCommand) -> Result<()>;
}

// Container-side ports
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkSpec {
    pub name: String,
    pub subnet: String,
    pub gateway: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindMount {
    pub source: String,
    pub target: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadinessProbe {
    /// The mapped host port accepts TCP connections.
    ListeningPort,
    /// An HTTP GET on the mapped host port answers with a success status.
    Http { path: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub cmd: Vec<String>,
    /// Container port published on a random host port.
    pub port: u16,
    pub network: String,
    pub mounts: Vec<BindMount>,
    pub privileged: bool,
    pub readiness: ReadinessProbe,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
    /// Host the published port is reachable on.
    pub host: String,
    pub host_port: u16,
}

impl ContainerHandle {
    pub fn endpoint(&self, scheme: &str) -> String {
        format!("{}://{}:{}", scheme, self.host, self.host_port)
    }
}

#[async_trait]
pub trait ContainerRuntimePort: Send + Sync {
    /// Returns the identifier to pass to `remove_network`.
    async fn create_network(&self, spec: &NetworkSpec) -> Result<String>;
    async fn remove_network(&self, id: &str) -> Result<()>;
    /// Pull (if needed), create and start a container.
    ///
    /// A container that fails to start is removed before the error is returned,
    /// so callers only own handles that were returned successfully.
    async fn start_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle>;
    async fn wait_until_ready(&self, handle: &ContainerHandle, probe: &ReadinessProbe) -> Result<()>;
    /// Stop and remove the container.
    async fn terminate_container(&self, handle: &ContainerHandle) -> Result<()>;
}
