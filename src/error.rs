use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{input} is not a valid url: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Grafana API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed get dashboards: {0}")]
    DashboardSource(#[source] anyhow::Error),

    #[error("serviceaccount was not created ({status}): {body}")]
    ServiceAccountCreation { status: u16, body: String },

    #[error("token was not created ({status}): {body}")]
    TokenCreation { status: u16, body: String },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<CliError>,
    },

    #[error("Container runtime error: {0}")]
    Container(String),

    #[error("{service} did not accept connections on port {port} after {attempts} attempts")]
    NotReady {
        service: String,
        port: u16,
        attempts: u32,
    },

    #[error("interrupted before the dev environment was ready")]
    Interrupted,

    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("{}", join_errors(.0))]
    Aggregate(Vec<CliError>),

    #[error("teardown failed: {}", join_errors(.0))]
    Teardown(Vec<CliError>),
}

impl CliError {
    /// Wraps the error with a leading message, keeping the original as source.
    /// An interrupt stays bare so callers can match on it.
    pub fn context(self, context: impl Into<String>) -> Self {
        match self {
            CliError::Interrupted => CliError::Interrupted,
            other => CliError::Context {
                context: context.into(),
                source: Box::new(other),
            },
        }
    }
}

fn join_errors(errors: &[CliError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<bollard::errors::Error> for CliError {
    fn from(err: bollard::errors::Error) -> Self {
        CliError::Container(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_joins_every_message() {
        let err = CliError::Aggregate(vec![
            CliError::Api { status: 404, body: "missing a".to_string() },
            CliError::Api { status: 500, body: "boom b".to_string() },
        ]);
        let msg = err.to_string();
        assert_eq!(msg, "Grafana API error (404): missing a\nGrafana API error (500): boom b");
    }

    #[test]
    fn test_context_prefixes_message() {
        let err = CliError::Config("bad".to_string()).context("apply");
        assert_eq!(err.to_string(), "apply: Configuration error: bad");
    }

    #[test]
    fn test_context_leaves_interrupt_bare() {
        let err = CliError::Interrupted.context("error start grafana");
        assert!(matches!(err, CliError::Interrupted));
    }
}
