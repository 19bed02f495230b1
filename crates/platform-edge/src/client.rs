//! Backend tenant API client.
//!
//! HTTP client for the backend's tenant endpoints: the protected single
//! tenant lookup (by domain or by id) and the bulk cache export used by
//! preload mode.

use platform_tenant::{TenantId, TenantPayload, TENANT_DOMAIN_HEADER};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use crate::error::{EdgeError, EdgeResult};
use crate::settings::BackendEndpoint;

/// Header selecting a tenant by id on the protected endpoint.
pub const TENANT_ID_HEADER: &str = "X-Tenant-Id";

/// Single tenant lookup path.
pub const PROTECTED_PATH: &str = "/api/tenant/protected";

/// Bulk export path.
pub const CACHE_PATH: &str = "/api/tenant/cache";

/// Bulk export body: either a bare list or wrapped in `tenants`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BulkResponse {
    List(Vec<TenantPayload>),
    Wrapped { tenants: Vec<TenantPayload> },
}

impl BulkResponse {
    fn into_tenants(self) -> Vec<TenantPayload> {
        match self {
            BulkResponse::List(tenants) | BulkResponse::Wrapped { tenants } => tenants,
        }
    }
}

/// Backend tenant API client.
#[derive(Clone)]
pub struct BackendClient {
    /// HTTP client instance.
    client: Client,

    /// Backend endpoint configuration.
    endpoint: BackendEndpoint,

    /// Request timeout.
    timeout: Duration,
}

impl BackendClient {
    /// Create a new backend client.
    pub fn new(endpoint: BackendEndpoint, timeout: Duration) -> EdgeResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the tenant serving `domain`. `None` when the backend has none.
    #[instrument(skip(self))]
    pub async fn fetch_by_domain(&self, domain: &str) -> EdgeResult<Option<TenantPayload>> {
        debug!("Fetching tenant by domain");
        let request = self
            .client
            .get(self.endpoint.url(PROTECTED_PATH))
            .header(TENANT_DOMAIN_HEADER, domain);
        self.fetch_one(request).await
    }

    /// Fetch a tenant by id. Used to load parents in lazy mode.
    #[instrument(skip(self))]
    pub async fn fetch_by_id(&self, id: TenantId) -> EdgeResult<Option<TenantPayload>> {
        debug!("Fetching tenant by id");
        let request = self
            .client
            .get(self.endpoint.url(PROTECTED_PATH))
            .header(TENANT_ID_HEADER, id.to_string());
        self.fetch_one(request).await
    }

    /// Fetch every tenant with its config.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> EdgeResult<Vec<TenantPayload>> {
        debug!("Fetching all tenants");
        let request = self.client.get(self.endpoint.url(CACHE_PATH));
        let response = self.authorize(request).send().await?;
        let body: BulkResponse = self.handle_response(response).await?;
        Ok(body.into_tenants())
    }

    async fn fetch_one(&self, request: RequestBuilder) -> EdgeResult<Option<TenantPayload>> {
        let response = self.authorize(request).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Backend has no such tenant");
            return Ok(None);
        }

        self.handle_response(response).await.map(Some)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.endpoint.api_key {
            Some(ref api_key) => request.header("Authorization", format!("Bearer {}", api_key)),
            None => request,
        }
    }

    async fn handle_response<T>(&self, response: reqwest::Response) -> EdgeResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            error!("Tenant API authentication failed");
            return Err(EdgeError::AuthenticationFailed);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Tenant API error ({}): {}", status.as_u16(), message);
            return Err(EdgeError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| EdgeError::InvalidResponse(e.to_string()))
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.endpoint.base_url)
            .field("has_auth", &self.endpoint.has_auth())
            .field("timeout", &self.timeout)
            .finish()
    }
}
