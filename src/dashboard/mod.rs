//! Dashboard documents and the callback that produces them.

pub mod builder;
pub mod overrides;
pub mod query;
pub mod variable;

use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A dashboard as sent to Grafana.
///
/// Only `uid` and `title` are interpreted; everything else is forwarded as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub uid: String,
    pub title: String,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Dashboard {
    pub fn new(uid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            title: title.into(),
            body: Map::new(),
        }
    }

    /// Set a top level field of the dashboard JSON.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }
}

/// Produces the dashboards to manage for a folder.
///
/// Receives the folder name and the matches of the invoked subcommand, so
/// embedding programs can read their own flags.
pub trait DashboardSource: Send + Sync {
    fn dashboards(&self, folder_name: &str, matches: &ArgMatches) -> anyhow::Result<Vec<Dashboard>>;
}

impl<F> DashboardSource for F
where
    F: Fn(&str, &ArgMatches) -> anyhow::Result<Vec<Dashboard>> + Send + Sync,
{
    fn dashboards(&self, folder_name: &str, matches: &ArgMatches) -> anyhow::Result<Vec<Dashboard>> {
        self(folder_name, matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_fields_flatten_next_to_uid_and_title() {
        let dashboard = Dashboard::new("abc", "ABC").with_field("tags", json!(["generated"]));
        let value = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(value, json!({"uid": "abc", "title": "ABC", "tags": ["generated"]}));

        let parsed: Dashboard = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.field("tags"), Some(&json!(["generated"])));
    }
}
