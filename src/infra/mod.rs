pub mod docker;
pub mod http_client;

pub use docker::DockerRuntime;
pub use http_client::BasicAuthTransport;
