use reqwest::{Method, StatusCode};
use tracing::{debug, info};

use crate::config::Credentials;
use crate::error::{CliError, Result};
use crate::grafana::models::{
    ServiceAccountPayload, ServiceAccountResponse, ServiceAccountTokenPayload, ServiceAccountTokenResponse,
};
use crate::infra::http_client::BasicAuthTransport;

const SERVICE_ACCOUNT_ROLE: &str = "Admin";

/// Mints API tokens through Grafana's service-account endpoints using basic auth.
pub struct ServiceAccountProvisioner {
    url: String,
    transport: BasicAuthTransport,
}

impl ServiceAccountProvisioner {
    /// `url` is the Grafana root, e.g. `http://localhost:3000`.
    pub fn new(url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            transport: BasicAuthTransport::new(credentials)?,
        })
    }

    /// Create an admin service account, then a token for it, and return the token secret.
    ///
    /// The account is not deleted when token creation fails.
    pub async fn create_api_key(&self, service_account_name: &str, token_name: &str) -> Result<String> {
        let accounts_url = format!("{}/api/serviceaccounts", self.url.trim_end_matches('/'));

        let payload = serde_json::to_vec(&ServiceAccountPayload {
            name: service_account_name,
            role: SERVICE_ACCOUNT_ROLE,
        })
        .map_err(|e| CliError::from(e).context("unable to marshal ServiceAccountPayload"))?;

        let request = self
            .transport
            .request(Method::POST, &accounts_url)
            .body(payload)
            .build()
            .map_err(|e| CliError::from(e).context("unable to create service account request"))?;
        let response = self
            .transport
            .round_trip(request)
            .await
            .map_err(|e| CliError::from(e).context("unable to get service account response"))?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(CliError::ServiceAccountCreation {
                status: status.as_u16(),
                body,
            });
        }
        let account: ServiceAccountResponse = response
            .json()
            .await
            .map_err(|e| CliError::from(e).context("unable to unmarshal ServiceAccountResponse"))?;
        debug!(account_id = account.id, name = %account.name, "service account created");

        let tokens_url = format!("{}/{}/tokens", accounts_url, account.id);
        let payload = serde_json::to_vec(&ServiceAccountTokenPayload { name: token_name })
            .map_err(|e| CliError::from(e).context("unable to marshal ServiceAccountTokenPayload"))?;

        let request = self
            .transport
            .request(Method::POST, &tokens_url)
            .body(payload)
            .build()
            .map_err(|e| CliError::from(e).context("unable to create token request"))?;
        let response = self
            .transport
            .round_trip(request)
            .await
            .map_err(|e| CliError::from(e).context("unable to execute request for token"))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(CliError::TokenCreation {
                status: status.as_u16(),
                body,
            });
        }
        let token: ServiceAccountTokenResponse = response
            .json()
            .await
            .map_err(|e| CliError::from(e).context("unable to unmarshal ServiceAccountTokenResponse"))?;

        info!(service_account = service_account_name, token = token_name, "grafana api key created");
        Ok(token.key)
    }
}
