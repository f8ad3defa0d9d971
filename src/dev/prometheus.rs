use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{PROMETHEUS_CONFIG_FILE, PROMETHEUS_DIR};
use crate::error::Result;

/// Default scrape config written on first `dev init` / `dev run`.
pub const PROMETHEUS_TEMPLATE: &str = include_str!("prometheus.yml.tmpl");

/// Directory mounted into the Prometheus container.
pub fn config_dir(workdir: &Path) -> PathBuf {
    workdir.join(PROMETHEUS_DIR)
}

/// Create `<workdir>/prometheus/prometheus.yml` if missing. An existing file is left untouched.
///
/// Returns the config file path.
pub fn init_config(workdir: &Path) -> Result<PathBuf> {
    let dir = config_dir(workdir);
    if !dir.exists() {
        fs::create_dir(&dir)?;
        info!(path = %dir.display(), "created prometheus config directory");
    }

    let file = dir.join(PROMETHEUS_CONFIG_FILE);
    if !file.exists() {
        fs::write(&file, PROMETHEUS_TEMPLATE)?;
        info!(path = %file.display(), "wrote default prometheus config");
    }

    Ok(file)
}
