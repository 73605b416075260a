use std::sync::Arc;

use anyhow::Result;
use cuaca_app::{build_weather_service, map_startup_error, WeatherState};

#[tokio::main]
async fn main() -> Result<()> {
    cuaca_core::init()?;

    let (config, _) = cuaca_core::Config::load_validated().map_err(startup_failure)?;
    let region = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.weather.default_region.clone());

    let service = Arc::new(
        build_weather_service(&config)
            .await
            .map_err(startup_failure)?,
    );
    let state = WeatherState::new(service.clone());

    let evicted = state.clear_expired_cache().await;
    tracing::debug!("Startup housekeeping evicted {} cache entries", evicted);

    let summary = state.refresh_all(&region).await;
    let snapshot = state.snapshot();

    println!("Cuaca - weather for region {}", region);

    if let Some(forecast) = &snapshot.forecast {
        let place = forecast.location.display_name().unwrap_or("unknown area");
        println!("\nForecast for {}:", place);
        for (day, daily) in forecast.daily_forecasts.iter().enumerate() {
            let range = daily
                .temperature_range()
                .map(|(lo, hi)| format!("{:.0}-{:.0} C", lo, hi))
                .unwrap_or_else(|| "n/a".to_string());
            let desc = daily
                .slots
                .first()
                .map(|s| s.description.secondary.as_str())
                .unwrap_or("");
            println!("  Day {}: {} ({} slots) {}", day + 1, range, daily.len(), desc);
        }
    }

    println!(
        "\nEarly warnings: {}",
        if snapshot.early_warning.is_some() { "received" } else { "unavailable" }
    );
    println!(
        "Maritime: {}",
        if snapshot.maritime.is_some() { "received" } else { "unavailable" }
    );

    if let Some(message) = &snapshot.last_error {
        println!("\n{}", message);
    }

    let stats = service.cache_stats().await;
    println!(
        "\nCache: {} backend, {} entries ({} expired)",
        stats.backend, stats.entries, stats.expired
    );

    if !summary.all_ok() {
        tracing::warn!("Some weather data could not be refreshed");
    }
    Ok(())
}

/// Show the user-facing message, keep the full chain for the exit report.
fn startup_failure(e: anyhow::Error) -> anyhow::Error {
    let err = map_startup_error(e);
    tracing::error!("Startup failed: {:?}", err);
    eprintln!("{}", err.user_message());
    err.into()
}
