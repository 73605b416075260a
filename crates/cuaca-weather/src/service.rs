//! Cache-first, retry-on-miss facade over the upstream client.
//!
//! Each call is independent: look up the cache, on a miss fetch through
//! [`with_retry`], normalize (forecast only), write back with the kind's TTL.
//! Concurrent misses on the same key each go upstream; the last write wins.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{forecast_key, CacheStats, CacheStore, EARLY_WARNING_KEY, MARITIME_KEY};
use crate::client::WeatherSource;
use crate::clock::Clock;
use crate::error::WeatherError;
use crate::normalize::{normalize_forecast, validate_raw_forecast};
use crate::retry::{with_retry, RetryPolicy, AUXILIARY_RETRY, FORECAST_RETRY};
use crate::types::{EarlyWarning, ForecastResponse, MaritimeData, FORECAST_DAYS};

/// Per-kind cache lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub forecast: Duration,
    pub early_warning: Duration,
    pub maritime: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            forecast: Duration::from_millis(1_800_000),
            early_warning: Duration::from_millis(600_000),
            maritime: Duration::from_millis(1_800_000),
        }
    }
}

pub struct WeatherService {
    source: Arc<dyn WeatherSource>,
    cache: Arc<CacheStore>,
    clock: Arc<dyn Clock>,
    ttls: CacheTtls,
    forecast_retry: RetryPolicy,
    auxiliary_retry: RetryPolicy,
}

impl std::fmt::Debug for WeatherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherService")
            .field("cache", &self.cache)
            .field("ttls", &self.ttls)
            .field("forecast_retry", &self.forecast_retry)
            .field("auxiliary_retry", &self.auxiliary_retry)
            .finish()
    }
}

impl WeatherService {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        cache: Arc<CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            cache,
            clock,
            ttls: CacheTtls::default(),
            forecast_retry: FORECAST_RETRY,
            auxiliary_retry: AUXILIARY_RETRY,
        }
    }

    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    /// Override the retry policies (forecast, then warnings/maritime).
    pub fn with_retry_policies(mut self, forecast: RetryPolicy, auxiliary: RetryPolicy) -> Self {
        self.forecast_retry = forecast;
        self.auxiliary_retry = auxiliary;
        self
    }

    pub fn ttls(&self) -> CacheTtls {
        self.ttls
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Normalized 3-day forecast for `region_code` (adm4).
    pub async fn forecast(&self, region_code: &str) -> Result<ForecastResponse, WeatherError> {
        let key = forecast_key(region_code);

        if let Some(cached) = self.cache.get::<ForecastResponse>(&key).await {
            tracing::debug!("Forecast cache hit for {}", region_code);
            return Ok(cached);
        }

        tracing::debug!("Forecast cache miss for {}, fetching", region_code);
        let mut forecast = with_retry(self.forecast_retry, "fetch_forecast", || {
            self.load_forecast(region_code)
        })
        .await
        .map_err(|e| log_fetch_failure("Forecast", e))?;

        if forecast.daily_forecasts.len() != FORECAST_DAYS {
            tracing::warn!(
                "Forecast for {} has {} days, expected {}",
                region_code,
                forecast.daily_forecasts.len(),
                FORECAST_DAYS
            );
            forecast.daily_forecasts.truncate(FORECAST_DAYS);
        }

        self.cache.set(&key, &forecast, self.ttls.forecast).await;
        tracing::info!(
            "Fetched forecast for {} ({} days, {} upstream slots)",
            region_code,
            forecast.daily_forecasts.len(),
            forecast.total_forecast_count
        );
        Ok(forecast)
    }

    /// One fetch-validate-normalize pass; retried as a unit.
    async fn load_forecast(&self, region_code: &str) -> Result<ForecastResponse, WeatherError> {
        let raw = self.source.fetch_forecast(region_code).await?;
        validate_raw_forecast(&raw)?;

        let forecast = normalize_forecast(raw, self.clock.now())?;
        if forecast.daily_forecasts.is_empty() {
            return Err(WeatherError::Validation(format!(
                "forecast for {} produced no days",
                region_code
            )));
        }
        Ok(forecast)
    }

    /// Latest early-warning payload, unmodified.
    pub async fn early_warnings(&self) -> Result<EarlyWarning, WeatherError> {
        if let Some(cached) = self.cache.get::<EarlyWarning>(EARLY_WARNING_KEY).await {
            tracing::debug!("Early warning cache hit");
            return Ok(cached);
        }

        let warning = with_retry(self.auxiliary_retry, "fetch_early_warning", || {
            self.source.fetch_early_warning()
        })
        .await
        .map_err(|e| log_fetch_failure("Early warning", e))?;

        self.cache
            .set(EARLY_WARNING_KEY, &warning, self.ttls.early_warning)
            .await;
        tracing::info!("Fetched early warnings");
        Ok(warning)
    }

    /// Latest maritime payload, unmodified.
    pub async fn maritime(&self) -> Result<MaritimeData, WeatherError> {
        if let Some(cached) = self.cache.get::<MaritimeData>(MARITIME_KEY).await {
            tracing::debug!("Maritime cache hit");
            return Ok(cached);
        }

        let maritime = with_retry(self.auxiliary_retry, "fetch_maritime", || {
            self.source.fetch_maritime()
        })
        .await
        .map_err(|e| log_fetch_failure("Maritime", e))?;

        self.cache.set(MARITIME_KEY, &maritime, self.ttls.maritime).await;
        tracing::info!("Fetched maritime data");
        Ok(maritime)
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn clear_expired_cache(&self) -> usize {
        self.cache.clear_expired().await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

/// "transient" for outages worth retrying later, "permanent" for contract problems.
fn failure_class(e: &WeatherError) -> &'static str {
    if e.is_transient() {
        "transient"
    } else {
        "permanent"
    }
}

fn log_fetch_failure(kind: &str, e: WeatherError) -> WeatherError {
    let class = failure_class(&e);
    if e.is_transient() {
        tracing::warn!("{} fetch gave up ({}): {}", kind, class, e);
    } else {
        tracing::error!("{} fetch gave up ({}): {}", kind, class, e);
    }
    e
}
