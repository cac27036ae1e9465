//! Main zone API client implementation.

use crate::api::{DomainApi, ZonesApi};
use crate::config::{RateLimit, RetryPolicy};
use crate::limiter::RateLimiter;
use mailguard_core::{ApiResponse, GuardError, Result};
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// The zone API base URL
const DEFAULT_BASE_URL: &str = "https://api.autodns.com/v1";

/// Header carrying the account context on every request
pub const CONTEXT_HEADER: &str = "X-Domainrobot-Context";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default page size for domain searches
const DEFAULT_PAGE_SIZE: u32 = 500;

/// Rate-limited, retrying client for the zone-management API
#[derive(Clone)]
pub struct ZoneClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    base_url: Url,
    username: String,
    password: String,
    context: String,
    retry: RetryPolicy,
    limiter: RateLimiter,
    dry_run: bool,
    page_size: u32,
}

impl ZoneClient {
    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(username: impl Into<String>, password: impl Into<String>) -> ZoneClientBuilder {
        ZoneClientBuilder::new(username, password)
    }

    /// Access domain endpoints
    #[must_use]
    pub fn domains(&self) -> DomainApi<'_> {
        DomainApi::new(self)
    }

    /// Access zone endpoints
    #[must_use]
    pub fn zones(&self) -> ZonesApi<'_> {
        ZonesApi::new(self)
    }

    /// Whether zone writes are suppressed
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.inner.dry_run
    }

    pub(crate) fn page_size(&self) -> u32 {
        self.inner.page_size
    }

    /// Stop the rate limiter's refill timer
    ///
    /// Call once the run is over so no timer outlives it.
    pub async fn shutdown(&self) {
        self.inner.limiter.shutdown().await;
    }

    /// Perform a GET request
    pub(crate) async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<ApiResponse<T>> {
        self.request::<T, ()>(Method::GET, segments, None).await
    }

    /// Perform a POST request with JSON body
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<ApiResponse<T>> {
        self.request(Method::POST, segments, Some(body)).await
    }

    /// Perform a PUT request with JSON body
    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<ApiResponse<T>> {
        self.request(Method::PUT, segments, Some(body)).await
    }

    /// Send a request under the retry policy, taking one rate-limit token per attempt
    async fn request<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<ApiResponse<T>> {
        let url = self.build_url(segments)?;
        let operation = format!("{method} {}", url.path());

        self.inner
            .retry
            .run(&operation, || self.send_once(method.clone(), url.clone(), body))
            .await
    }

    async fn send_once<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>> {
        self.inner.limiter.acquire().await?;
        debug!(method = %method, url = %url, "zone API request");

        let mut request = self
            .inner
            .http
            .request(method, url)
            .basic_auth(&self.inner.username, Some(&self.inner.password))
            .header(CONTEXT_HEADER, &self.inner.context);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport_error)?;
        self.handle_response(response).await
    }

    /// Build an endpoint URL from path segments
    fn build_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GuardError::Config(format!("invalid base URL: {}", self.inner.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Handle an API response carrying the `{status, data}` envelope
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<ApiResponse<T>> {
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(self.handle_error(status.as_u16(), &body));
        }

        if body.trim().is_empty() {
            return Ok(ApiResponse {
                status: None,
                data: Vec::new(),
            });
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        if let Some(api_status) = envelope.status.as_ref().filter(|s| s.is_error()) {
            let text = api_status
                .text
                .clone()
                .or_else(|| api_status.code.clone())
                .unwrap_or_else(|| "unspecified error".to_string());
            return Err(GuardError::Logical(text));
        }

        Ok(envelope)
    }

    /// Convert an error response to a `GuardError`
    fn handle_error(&self, status: u16, body: &str) -> GuardError {
        // Try to parse error message from the envelope
        let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
            .ok()
            .and_then(|e| e.status)
            .and_then(|s| s.text)
            .unwrap_or_else(|| body.to_string());

        match status {
            401 | 403 => GuardError::Unauthorized,
            404 => GuardError::NotFound { resource: message },
            429 => {
                warn!("rate limited by zone API");
                GuardError::RateLimited
            }
            _ => GuardError::Api {
                code: status,
                message,
            },
        }
    }
}

impl std::fmt::Debug for ZoneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("dry_run", &self.inner.dry_run)
            .finish_non_exhaustive()
    }
}

/// Classify a transport-level failure
fn transport_error(err: reqwest::Error) -> GuardError {
    if err.is_timeout() {
        GuardError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() {
        GuardError::Connection(err.to_string())
    } else {
        GuardError::Http(err.to_string())
    }
}

/// Builder for configuring a [`ZoneClient`]
pub struct ZoneClientBuilder {
    username: String,
    password: String,
    base_url: String,
    context: String,
    timeout: Duration,
    user_agent: String,
    retry: RetryPolicy,
    rate_limit: RateLimit,
    dry_run: bool,
    page_size: u32,
}

impl ZoneClientBuilder {
    /// Create a new builder with the given credentials
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            context: "4".to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("mailguard/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryPolicy::default(),
            rate_limit: RateLimit::default(),
            dry_run: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the base URL (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the account context sent in [`CONTEXT_HEADER`]
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set retry configuration
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set the token-bucket limits
    #[must_use]
    pub const fn rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limit = limit;
        self
    }

    /// Suppress zone writes
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Set the domain search page size
    #[must_use]
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Build the client and start its rate limiter
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<ZoneClient> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| GuardError::Config(format!("invalid base URL {}: {e}", self.base_url)))?;

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| GuardError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(ZoneClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                username: self.username,
                password: self.password,
                context: self.context,
                retry: self.retry,
                limiter: RateLimiter::start(self.rate_limit),
                dry_run: self.dry_run,
                page_size: self.page_size,
            }),
        })
    }
}
