//! Request and response bodies of the Grafana HTTP API endpoints we consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dashboard::Dashboard;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(default)]
    pub id: Option<i64>,
    pub uid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateFolderCommand {
    pub uid: String,
    pub title: String,
}

impl CreateFolderCommand {
    /// Folder whose uid and title are both the folder name.
    pub fn named(folder_name: &str) -> Self {
        Self {
            uid: folder_name.to_string(),
            title: folder_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDashboardCommand<'a> {
    pub dashboard: &'a Dashboard,
    pub folder_uid: &'a str,
    pub overwrite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostDashboardResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDataSourceCommand {
    pub name: String,
    pub uid: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub access: String,
    pub is_default: bool,
}

impl AddDataSourceCommand {
    /// Proxy-access Prometheus datasource whose uid is its name.
    pub fn prometheus(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            uid: name.to_string(),
            kind: "prometheus".to_string(),
            url: url.to_string(),
            access: "proxy".to_string(),
            is_default: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceAccountPayload<'a> {
    pub name: &'a str,
    pub role: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceAccountTokenPayload<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountResponse {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub org_id: i64,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub teams: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServiceAccountTokenResponse {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub key: String,
}
