//! HTTP client for the NetScaler Control Center

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::error::{NccError, Result};

/// Raw response of a successful Control Center call
#[derive(Clone, Debug, PartialEq)]
pub struct NccResponse {
    pub status: u16,
    pub body: String,
}

impl NccResponse {
    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Operations the driver needs from the Control Center.
///
/// Every failure, transport or application, is reported as an [`NccError`].
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// POST `{resource_key: body}` to a collection path
    async fn create_resource(
        &self,
        tenant_id: &str,
        path: &str,
        resource_key: &str,
        body: &Map<String, Value>,
    ) -> Result<NccResponse>;

    /// PUT `{resource_key: body}` to a resource path
    async fn update_resource(
        &self,
        tenant_id: &str,
        path: &str,
        resource_key: &str,
        body: &Map<String, Value>,
    ) -> Result<NccResponse>;

    async fn remove_resource(&self, tenant_id: &str, path: &str) -> Result<NccResponse>;

    async fn retrieve_resource(&self, tenant_id: &str, path: &str) -> Result<NccResponse>;
}

/// Connection settings for [`NccClient`]
#[derive(Clone, Debug)]
pub struct NccClientConfig {
    pub uri: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub cleanup_mode: Option<String>,
    pub timeout: Duration,
}

/// reqwest-backed [`RemoteClient`]
#[derive(Clone)]
pub struct NccClient {
    http_client: Client,
    base_uri: Url,
    username: Option<String>,
    password: Option<String>,
    cleanup_mode: Option<String>,
}

impl NccClient {
    pub fn new(config: NccClientConfig) -> Result<Self> {
        let base_uri = Url::parse(&config.uri)
            .map_err(|e| NccError::InvalidUri(format!("{}: {}", config.uri, e)))?;
        if base_uri.cannot_be_a_base() {
            return Err(NccError::InvalidUri(config.uri));
        }

        let http_client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http_client,
            base_uri,
            username: config.username,
            password: config.password,
            cleanup_mode: config.cleanup_mode,
        })
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_uri.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn execute(
        &self,
        method: Method,
        tenant_id: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<NccResponse> {
        let url = self.url_for(path);
        debug!("{} {} (tenant {})", method, url, tenant_id);

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .header("X-Tenant-ID", tenant_id);

        if let Some(mode) = &self.cleanup_mode {
            request = request.header("Cleanup-Mode", mode);
        }
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            warn!("{} {} failed: {}", method, url, e);
            NccError::Http(e)
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("{} {} returned HTTP {}", method, url, status);
            return Err(NccError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(NccResponse {
            status: status.as_u16(),
            body: text,
        })
    }
}

fn wrap(resource_key: &str, body: &Map<String, Value>) -> Value {
    let mut wrapped = Map::new();
    wrapped.insert(resource_key.to_string(), Value::Object(body.clone()));
    Value::Object(wrapped)
}

#[async_trait]
impl RemoteClient for NccClient {
    async fn create_resource(
        &self,
        tenant_id: &str,
        path: &str,
        resource_key: &str,
        body: &Map<String, Value>,
    ) -> Result<NccResponse> {
        self.execute(Method::POST, tenant_id, path, Some(wrap(resource_key, body)))
            .await
    }

    async fn update_resource(
        &self,
        tenant_id: &str,
        path: &str,
        resource_key: &str,
        body: &Map<String, Value>,
    ) -> Result<NccResponse> {
        self.execute(Method::PUT, tenant_id, path, Some(wrap(resource_key, body)))
            .await
    }

    async fn remove_resource(&self, tenant_id: &str, path: &str) -> Result<NccResponse> {
        self.execute(Method::DELETE, tenant_id, path, None).await
    }

    async fn retrieve_resource(&self, tenant_id: &str, path: &str) -> Result<NccResponse> {
        self.execute(Method::GET, tenant_id, path, None).await
    }
}
