//! Builds the weather pipeline from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cuaca_core::Config;
use cuaca_weather::{
    probe_backend, BmkgClient, CacheStore, CacheTtls, Endpoints, SystemClock, WeatherService,
};

fn endpoints(config: &Config) -> Endpoints {
    Endpoints {
        forecast_base: config.endpoints.forecast_base_url.clone(),
        warning_base: config.endpoints.warning_base_url.clone(),
        maritime_base: config.endpoints.maritime_base_url.clone(),
    }
}

fn ttls(config: &Config) -> CacheTtls {
    let minutes = |m: u64| Duration::from_secs(m.saturating_mul(60));
    CacheTtls {
        forecast: minutes(config.cache.forecast_ttl_minutes),
        early_warning: minutes(config.cache.warning_ttl_minutes),
        maritime: minutes(config.cache.maritime_ttl_minutes),
    }
}

/// Construct the client, cache and orchestrator described by `config`.
///
/// The cache directory is probed once here; when it is unusable the service
/// runs on an in-memory cache for the life of the process.
pub async fn build_weather_service(config: &Config) -> Result<WeatherService> {
    let client = BmkgClient::with_options(
        endpoints(config),
        Duration::from_secs(config.http.request_timeout_secs),
        &config.http.user_agent,
    )
    .context("Failed to create weather client")?;

    let cache_dir = config
        .cache
        .prefer_durable
        .then_some(config.cache.directory.as_path());
    let backend = probe_backend(cache_dir).await;

    let clock = Arc::new(SystemClock);
    let cache = Arc::new(CacheStore::new(backend, clock.clone()));

    let service = WeatherService::new(Arc::new(client), cache, clock).with_ttls(ttls(config));
    tracing::info!(
        "Weather service initialized ({} cache)",
        service.cache().backend_kind()
    );
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttls_follow_config() {
        let mut config = Config::default();
        config.cache.warning_ttl_minutes = 5;

        let ttls = ttls(&config);
        assert_eq!(ttls.forecast, Duration::from_millis(1_800_000));
        assert_eq!(ttls.early_warning, Duration::from_secs(300));
        assert_eq!(ttls.maritime, Duration::from_millis(1_800_000));
    }

    #[test]
    fn test_default_ttls_match_pipeline_defaults() {
        assert_eq!(ttls(&Config::default()), CacheTtls::default());
    }

    #[tokio::test]
    async fn test_memory_cache_when_durable_disabled() {
        let mut config = Config::default();
        config.cache.prefer_durable = false;

        let service = build_weather_service(&config).await.unwrap();
        assert_eq!(service.cache().backend_kind(), "memory");
    }
}
