//! Demo program: manages a generated "Prometheus Overview" dashboard.
//!
//! Programs embedding the library follow the same shape: register a dashboard
//! source, optionally override flag defaults, then hand over the arguments.

use clap::ArgMatches;
use tracing::error;

use grafana_cli_starter::dashboard::builder::DashboardBuilder;
use grafana_cli_starter::dashboard::variable::DataSourceRef;
use grafana_cli_starter::{logging, CliBuilder, CliError, Dashboard, DashboardFlag};

const APP_NAME: &str = "grafana_cli_starter";
const DATASOURCE: &str = "prometheus";

fn dashboards(folder_name: &str, _matches: &ArgMatches) -> anyhow::Result<Vec<Dashboard>> {
    let overview = DashboardBuilder::prometheus_overview(DataSourceRef::prometheus(DATASOURCE))
        .with_tag(folder_name)
        .build();
    Ok(vec![overview])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging(APP_NAME);

    let cli = CliBuilder::new(APP_NAME)
        .dashboard_source(dashboards)
        .default_dashboard_flag(DashboardFlag::FolderName, "demo")
        .default_dev_datasource(DATASOURCE)
        .build()?;

    match cli.run(std::env::args_os()).await {
        Ok(()) => Ok(()),
        // --help, --version and usage errors print themselves
        Err(CliError::Usage(e)) => e.exit(),
        Err(e) => {
            error!(error = %e, "command failed");
            Err(e.into())
        }
    }
}
