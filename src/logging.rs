use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::flag_env_name;

/// Initializes logging on stderr, plus a JSON file layer when `<APP>_LOG_DIR` is set.
///
/// Stdout stays reserved for command output (dashboard URLs, plan JSON, dev endpoints).
pub fn init_logging(app_name: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("grafana_cli_starter=info"));

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let file_layer = std::env::var(flag_env_name("log_dir", app_name))
        .ok()
        .and_then(|dir| {
            // Logging to file is best effort
            fs::create_dir_all(&dir).ok()?;
            let file_appender = tracing_appender::rolling::daily(&dir, format!("{}.log", app_name));
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
            // Keep the guard alive for the whole process so logs are flushed on exit
            std::mem::forget(guard);
            Some(fmt::layer().json().with_writer(non_blocking_writer))
        });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();
}
