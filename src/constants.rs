/// Flag names shared by the command tree and the environment variable lookup.
/// Env vars are derived from these as `<appName>_<FLAGNAME>`.

// dashboard command flags
pub const CLI_SERVER: &str = "server";
pub const CLI_API_KEY: &str = "apikey";
pub const CLI_API_BASE_PATH: &str = "apibasepath";
pub const CLI_FOLDER_NAME: &str = "foldername";

// dev run flags
pub const CLI_DEV_DATASOURCE_NAME: &str = "datasource_name";
pub const CLI_DEV_DATASOURCE_ALIAS: &str = "datasource";
pub const CLI_DEV_SUBNET: &str = "subnet";
pub const CLI_DEV_GATEWAY: &str = "gateway";

pub const DEFAULT_API_BASE_PATH: &str = "/api";
pub const DEFAULT_DEV_SUBNET: &str = "192.168.192.0/20";
pub const DEFAULT_DEV_GATEWAY: &str = "192.168.192.1";

// Local dev environment
pub const PROMETHEUS_DIR: &str = "prometheus";
pub const PROMETHEUS_CONFIG_FILE: &str = "prometheus.yml";
pub const PROMETHEUS_IMAGE: &str = "prom/prometheus:latest";
pub const PROMETHEUS_PORT: u16 = 9090;
pub const PROMETHEUS_CONFIG_MOUNT: &str = "/etc/prometheus";
pub const GRAFANA_IMAGE: &str = "grafana/grafana:latest";
pub const GRAFANA_PORT: u16 = 3000;
pub const GRAFANA_ADMIN_USER: &str = "admin";
pub const GRAFANA_ADMIN_PASSWORD: &str = "admin";

// Service account used to mint the dev API key
pub const DEV_SERVICE_ACCOUNT: &str = "debug";
pub const DEV_TOKEN_NAME: &str = "test";

/// Build the environment variable name backing a flag.
pub fn flag_env_name(flag_name: &str, app_name: &str) -> String {
    format!("{}_{}", app_name, flag_name.to_uppercase())
}
