use tracing::{info, warn};

use crate::app::ports::{ContainerHandle, ContainerRuntimePort};
use crate::error::{CliError, Result};

/// An external resource owned by a dev session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevResource {
    Network { id: String, name: String },
    Container(ContainerHandle),
}

impl DevResource {
    pub fn name(&self) -> &str {
        match self {
            DevResource::Network { name, .. } => name,
            DevResource::Container(handle) => &handle.name,
        }
    }
}

/// Resources in acquisition order, released last-in first-out.
#[derive(Debug, Default)]
pub struct TeardownStack {
    resources: Vec<DevResource>,
}

impl TeardownStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: DevResource) {
        self.resources.push(resource);
    }

    /// Release every resource in reverse order. A failed release does not stop
    /// the remaining ones; all failures come back as one `Teardown` error.
    pub async fn release_all(&mut self, runtime: &dyn ContainerRuntimePort) -> Result<()> {
        let mut failures = Vec::new();

        while let Some(resource) = self.resources.pop() {
            let released = match &resource {
                DevResource::Container(handle) => runtime.terminate_container(handle).await,
                DevResource::Network { id, .. } => runtime.remove_network(id).await,
            };
            match released {
                Ok(()) => info!(resource = resource.name(), "released"),
                Err(e) => {
                    warn!(resource = resource.name(), error = %e, "release failed");
                    failures.push(e.context(format!("release {}", resource.name())));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CliError::Teardown(failures))
        }
    }
}
