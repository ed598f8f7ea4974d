//! HTTP client for the FitQuest REST backend.
//!
//! Each counter resource lives under `/api/{resource}` and is scoped to a
//! calendar day with a `date=YYYY-MM-DD` query parameter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;

use super::error::RemoteError;
use super::remote::CounterRemote;
use crate::models::{CounterResource, CounterState};

/// Timeout for the health probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Serialize)]
struct TargetBody {
    target: u32,
}

#[derive(Serialize)]
struct CountBody {
    count: u32,
}

/// [`CounterRemote`] backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    server_url: String,
    api_key: Option<String>,
    date: NaiveDate,
    http: reqwest::Client,
}

impl HttpRemote {
    /// Creates a client for today's counters.
    pub fn new(server_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            server_url: server_url.into(),
            api_key,
            date: Local::now().date_naive(),
            http: reqwest::Client::new(),
        }
    }

    /// Applies a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, RemoteError> {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(self)
    }

    /// Scopes every call to the given day.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Builds the full URL for a resource operation, e.g.
    /// `http://host/api/hydration/increment?date=2025-01-01`.
    fn resource_url(&self, resource: CounterResource, op: Option<&str>) -> String {
        let path = match op {
            Some(op) => format!("/api/{}/{}", resource.path(), op),
            None => format!("/api/{}", resource.path()),
        };
        format!(
            "{}?date={}",
            build_http_url(&self.server_url, &path),
            self.date.format("%Y-%m-%d")
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RemoteError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RemoteError::Unauthorized(status.as_u16()))
            }
            _ => Err(RemoteError::Status(status.as_u16())),
        }
    }
}

#[async_trait]
impl CounterRemote for HttpRemote {
    async fn fetch(&self, resource: CounterResource) -> Result<CounterState, RemoteError> {
        let url = self.resource_url(resource, None);
        tracing::debug!(%url, "fetching counter");

        let response = self.send(self.http.get(&url)).await?;
        response
            .json::<CounterState>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn increment(&self, resource: CounterResource) -> Result<(), RemoteError> {
        let url = self.resource_url(resource, Some("increment"));
        self.send(self.http.post(&url)).await?;
        Ok(())
    }

    async fn decrement(&self, resource: CounterResource) -> Result<(), RemoteError> {
        let url = self.resource_url(resource, Some("decrement"));
        self.send(self.http.post(&url)).await?;
        Ok(())
    }

    async fn set_target(
        &self,
        resource: CounterResource,
        target: u32,
    ) -> Result<(), RemoteError> {
        let url = self.resource_url(resource, Some("target"));
        self.send(self.http.put(&url).json(&TargetBody { target }))
            .await?;
        Ok(())
    }

    async fn set_count(&self, resource: CounterResource, count: u32) -> Result<(), RemoteError> {
        let url = self.resource_url(resource, Some("count"));
        match self.send(self.http.put(&url).json(&CountBody { count })).await {
            Ok(_) => Ok(()),
            Err(RemoteError::Status(404 | 405 | 501)) => Err(RemoteError::Unsupported(format!(
                "set {} count",
                resource
            ))),
            Err(e) => Err(e),
        }
    }
}

/// Normalizes a configured server URL and appends `path`.
///
/// Bare hosts get `http://` and trailing slashes are trimmed.
pub fn build_http_url(server_url: &str, path: &str) -> String {
    let base_url = if server_url.starts_with("http://") || server_url.starts_with("https://") {
        server_url.to_string()
    } else {
        format!("http://{}", server_url)
    };

    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Returns true if the server answers its health endpoint.
pub async fn check_server(server_url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(HEALTH_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(build_http_url(server_url, "/health")).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            tracing::debug!("health check failed: {}", e);
            false
        }
    }
}
