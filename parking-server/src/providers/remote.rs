//! Remote HTTP data source.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

use super::ParkingProvider;
use super::error::ProviderError;
use super::types::{RawObservation, parse_payload};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the remote data source.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the upstream API; records are fetched from `{base_url}/parking`
    pub base_url: String,
    /// Bearer token, sent when present
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl RemoteConfig {
    /// Create a new config for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Authenticate with a bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Data source that fetches records from an upstream HTTP API.
///
/// Any failure (network, non-2xx status, malformed body) is reported as
/// an error; a partial list is never returned.
#[derive(Debug, Clone)]
pub struct RemoteParkingProvider {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteParkingProvider {
    /// Create a new remote provider.
    pub fn new(config: RemoteConfig) -> Result<Self, ProviderError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ProviderError::InvalidConfig(
                "base URL must be provided for the remote provider".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
                ProviderError::InvalidConfig("invalid API key format".to_string())
            })?;
            bearer.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn load(&self) -> Result<Vec<RawObservation>, ProviderError> {
        let url = format!("{}/parking", self.base_url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        let records = parse_payload(&body, &url)?;

        // Upstream records without provenance are attributed to the upstream
        Ok(records
            .into_iter()
            .map(|record| RawObservation {
                source: record
                    .source
                    .filter(|s| !s.is_empty())
                    .or_else(|| Some(self.base_url.clone())),
                ..record
            })
            .collect())
    }
}

impl ParkingProvider for RemoteParkingProvider {
    fn name(&self) -> &str {
        "remote"
    }

    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RawObservation>, ProviderError>> {
        self.load().boxed()
    }
}
