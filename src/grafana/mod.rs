pub mod client;
pub mod models;
pub mod service_account;

pub use client::HttpGrafanaClient;
pub use service_account::ServiceAccountProvisioner;
