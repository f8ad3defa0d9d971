use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::app::ports::GrafanaApiPort;
use crate::config::{ApiAuth, ConnectionConfig};
use crate::error::{CliError, Result};
use crate::grafana::models::{
    AddDataSourceCommand, CreateFolderCommand, Folder, PostDashboardResponse, SaveDashboardCommand,
};
use crate::infra::http_client::BasicAuthTransport;

enum Transport {
    ApiKey { client: Client, authorization: HeaderValue },
    Basic(BasicAuthTransport),
}

/// Grafana REST client limited to the folder, dashboard and datasource endpoints.
pub struct HttpGrafanaClient {
    config: ConnectionConfig,
    transport: Transport,
}

impl HttpGrafanaClient {
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let transport = match &config.auth {
            ApiAuth::ApiKey(key) => {
                let mut authorization = HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| CliError::Config(format!("invalid api key: {}", e)))?;
                authorization.set_sensitive(true);
                Transport::ApiKey {
                    client: Client::new(),
                    authorization,
                }
            }
            ApiAuth::Basic(credentials) => Transport::Basic(BasicAuthTransport::new(credentials.clone())?),
        };
        Ok(Self { config, transport })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_root(), path.trim_start_matches('/'))
    }

    async fn send(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Response> {
        let url = self.url(path);
        debug!(%method, %url, "grafana request");

        let response = match &self.transport {
            Transport::ApiKey { client, authorization } => {
                let mut builder = client
                    .request(method, &url)
                    .header(AUTHORIZATION, authorization.clone())
                    .header(CONTENT_TYPE, "application/json");
                if let Some(body) = body {
                    builder = builder.body(body);
                }
                builder.send().await?
            }
            Transport::Basic(transport) => {
                let mut builder = transport.request(method, &url);
                if let Some(body) = body {
                    builder = builder.body(body);
                }
                transport.round_trip(builder.build()?).await?
            }
        };

        check_status(response).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        let response = self.send(method, path, Some(payload)).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Turn any non-2xx response into an `Api` error carrying the body text.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CliError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl GrafanaApiPort for HttpGrafanaClient {
    async fn get_folder_by_uid(&self, uid: &str) -> Result<Folder> {
        let response = self.send(Method::GET, &format!("folders/{}", uid), None).await?;
        Ok(response.json::<Folder>().await?)
    }

    async fn create_folder(&self, command: &CreateFolderCommand) -> Result<Folder> {
        self.send_json(Method::POST, "folders", command).await
    }

    async fn post_dashboard(&self, command: &SaveDashboardCommand<'_>) -> Result<PostDashboardResponse> {
        self.send_json(Method::POST, "dashboards/db", command).await
    }

    async fn delete_dashboard_by_uid(&self, uid: &str) -> Result<()> {
        self.send(Method::DELETE, &format!("dashboards/uid/{}", uid), None)
            .await?;
        Ok(())
    }

    async fn add_data_source(&self, command: &AddDataSourceCommand) -> Result<()> {
        let payload = serde_json::to_vec(command)?;
        self.send(Method::POST, "datasources", Some(payload)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::dashboard::Dashboard;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_key_client(server: &MockServer) -> HttpGrafanaClient {
        let config =
            ConnectionConfig::from_server_url(&server.uri(), "/api", ApiAuth::ApiKey("secret".to_string()))
                .unwrap();
        HttpGrafanaClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_post_dashboard_sends_bearer_and_overwrite() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/dashboards/db"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({"folderUid": "team", "overwrite": true, "dashboard": {"uid": "d1"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3, "uid": "d1", "url": "/d/d1/first", "status": "success", "version": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = api_key_client(&server);
        let dashboard = Dashboard::new("d1", "First");
        let response = client
            .post_dashboard(&SaveDashboardCommand {
                dashboard: &dashboard,
                folder_uid: "team",
                overwrite: true,
                message: None,
            })
            .await
            .unwrap();
        assert_eq!(response.url, "/d/d1/first");
        assert_eq!(response.version, Some(1));
    }

    #[tokio::test]
    async fn test_missing_folder_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/folders/nope"))
            .respond_with(ResponseTemplate::new(404).set_body_string("folder not found"))
            .mount(&server)
            .await;

        let client = api_key_client(&server);
        let err = client.get_folder_by_uid("nope").await.unwrap_err();
        match err {
            CliError::Api { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "folder not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_basic_auth_client_adds_datasource() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/datasources"))
            .and(header("authorization", "Basic YWRtaW46YWRtaW4="))
            .and(body_partial_json(json!({"name": "prom", "type": "prometheus"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "message": "Datasource added"})))
            .expect(1)
            .mount(&server)
            .await;

        let config = ConnectionConfig::from_server_url(
            &server.uri(),
            "/api",
            ApiAuth::Basic(Credentials::new("admin", "admin")),
        )
        .unwrap();
        let client = HttpGrafanaClient::new(config).unwrap();
        client
            .add_data_source(&AddDataSourceCommand::prometheus("prom", "http://prometheus_x:9090"))
            .await
            .unwrap();
    }
}
