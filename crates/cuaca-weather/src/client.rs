//! HTTP client for the upstream meteorological API.
//!
//! Returns raw payloads only. Caching, retrying and normalization are layered
//! on top by [`WeatherService`](crate::service::WeatherService).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::WeatherError;
use crate::types::{EarlyWarning, MaritimeData, RawForecastPayload};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USER_AGENT: &str = concat!("Cuaca/", env!("CARGO_PKG_VERSION"));

/// Anything that can produce raw upstream payloads.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_forecast(&self, region_code: &str) -> Result<RawForecastPayload, WeatherError>;

    async fn fetch_early_warning(&self) -> Result<EarlyWarning, WeatherError>;

    async fn fetch_maritime(&self) -> Result<MaritimeData, WeatherError>;
}

/// Base URLs for the three endpoint families
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub forecast_base: String,
    pub warning_base: String,
    pub maritime_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            forecast_base: "https://api.bmkg.go.id/publik".to_string(),
            warning_base: "https://data.bmkg.go.id/DataMKG/TEWS".to_string(),
            maritime_base: "https://peta-maritim.bmkg.go.id/public_api".to_string(),
        }
    }
}

impl Endpoints {
    /// All three families served from one base (handy for tests and proxies).
    pub fn single(base: &str) -> Self {
        Self {
            forecast_base: base.to_string(),
            warning_base: base.to_string(),
            maritime_base: base.to_string(),
        }
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

#[derive(Debug, Clone)]
pub struct BmkgClient {
    client: Arc<Client>,
    endpoints: Endpoints,
}

impl BmkgClient {
    pub fn new(endpoints: Endpoints) -> Result<Self, WeatherError> {
        Self::with_options(endpoints, Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }

    pub fn with_options(
        endpoints: Endpoints,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| WeatherError::Network {
                operation: "build_client",
                message: e.to_string(),
            })?;

        Ok(Self {
            client: Arc::new(client),
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn forecast_url(&self, region_code: &str) -> Result<Url, WeatherError> {
        let raw = join(&self.endpoints.forecast_base, "prakiraan-cuaca");
        let mut url = Url::parse(&raw).map_err(|e| WeatherError::Network {
            operation: "fetch_forecast",
            message: format!("invalid endpoint {}: {}", raw, e),
        })?;
        url.query_pairs_mut().append_pair("adm4", region_code);
        Ok(url)
    }

    /// GET `url` and decode the JSON body, classifying every failure.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> Result<T, WeatherError> {
        tracing::debug!("{}: GET {}", operation, url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| classify_send_error(operation, url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Upstream {
                operation,
                status: status.as_u16(),
                endpoint: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_send_error(operation, url, e))?;

        serde_json::from_slice(&body).map_err(|e| WeatherError::Parse {
            operation,
            message: e.to_string(),
        })
    }
}

fn classify_send_error(operation: &'static str, url: &str, e: reqwest::Error) -> WeatherError {
    if e.is_timeout() {
        WeatherError::Timeout {
            operation,
            endpoint: url.to_string(),
        }
    } else if let Some(status) = e.status() {
        WeatherError::Upstream {
            operation,
            status: status.as_u16(),
            endpoint: url.to_string(),
        }
    } else {
        WeatherError::Network {
            operation,
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl WeatherSource for BmkgClient {
    async fn fetch_forecast(&self, region_code: &str) -> Result<RawForecastPayload, WeatherError> {
        let url = self.forecast_url(region_code)?;
        self.fetch_json("fetch_forecast", url.as_str()).await
    }

    async fn fetch_early_warning(&self) -> Result<EarlyWarning, WeatherError> {
        let url = join(&self.endpoints.warning_base, "autogempa.json");
        self.fetch_json("fetch_early_warning", &url).await
    }

    async fn fetch_maritime(&self) -> Result<MaritimeData, WeatherError> {
        let url = join(&self.endpoints.maritime_base, "perairan");
        self.fetch_json("fetch_maritime", &url).await
    }
}
