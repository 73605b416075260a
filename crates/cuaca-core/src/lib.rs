pub mod config;
pub mod error;

pub use config::{CacheConfig, Config, EndpointsConfig, HttpConfig, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError, NetworkError, WeatherError};

use anyhow::Result;

/// Initialize logging for the Cuaca application.
///
/// Honors `RUST_LOG`, defaulting to `info`. Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init() -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Cuaca core initialized");
    }
    Ok(())
}
