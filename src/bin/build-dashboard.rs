//! Dashboard Builder Binary
//!
//! Prints the generated "Prometheus Overview" dashboard as JSON, the same
//! document `dashboard apply` would upload, and saves it to a file.
//!
//! Usage:
//!   cargo run --bin build-dashboard                 # datasource uid "prometheus"
//!   cargo run --bin build-dashboard <datasource>    # custom datasource uid

use grafana_cli_starter::dashboard::builder::DashboardBuilder;
use grafana_cli_starter::dashboard::variable::DataSourceRef;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let datasource = env::args().nth(1).unwrap_or_else(|| "prometheus".to_string());

    let dashboard = DashboardBuilder::prometheus_overview(DataSourceRef::prometheus(&datasource)).build();
    let json_string = serde_json::to_string_pretty(&dashboard)?;

    println!("{}", json_string);

    let output_path = PathBuf::from(format!("{}.json", dashboard.uid));
    fs::write(&output_path, &json_string)?;

    eprintln!("✅ Dashboard generated for datasource {}", datasource);
    eprintln!("📄 Saved to: {}", output_path.display());
    Ok(())
}
