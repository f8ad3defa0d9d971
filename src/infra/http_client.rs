use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Request, Response};

use crate::config::Credentials;
use crate::error::{CliError, Result};

/// HTTP client wrapper that authenticates every request with basic auth and
/// marks it as JSON. Transport errors are passed through untouched.
#[derive(Clone, Debug)]
pub struct BasicAuthTransport {
    client: Client,
    authorization: HeaderValue,
}

impl BasicAuthTransport {
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_client(Client::new(), credentials)
    }

    pub fn with_client(client: Client, credentials: Credentials) -> Result<Self> {
        let encoded = STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
        let mut authorization = HeaderValue::from_str(&format!("Basic {}", encoded))
            .map_err(|e| CliError::Config(format!("invalid basic auth header: {}", e)))?;
        authorization.set_sensitive(true);

        Ok(Self { client, authorization })
    }

    /// Start a request on the underlying client; headers are added by `round_trip`.
    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url)
    }

    /// Decorate the request in place and send it.
    pub async fn round_trip(&self, mut request: Request) -> reqwest::Result<Response> {
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.client.execute(request).await
    }
}
