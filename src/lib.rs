pub mod cli;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod dev;
pub mod error;
pub mod grafana;
pub mod logging;
pub mod runner;

// Trait seams between the use cases and their adapters
pub mod app;
pub mod infra;

pub use cli::{Cli, CliBuilder, DashboardFlag};
pub use dashboard::{Dashboard, DashboardSource};
pub use error::{CliError, Result};
