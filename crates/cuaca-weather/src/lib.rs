//! Weather data pipeline for Cuaca
//!
//! Fetches forecast, early-warning and maritime data from the upstream
//! meteorological API, normalizes forecasts into a fixed 3-day shape, caches
//! results with per-kind TTLs and retries transient failures with backoff.

pub mod cache;
pub mod client;
pub mod clock;
pub mod error;
pub mod normalize;
pub mod retry;
pub mod service;
pub mod storage;
pub mod types;

pub use cache::{forecast_key, CacheEntry, CacheStats, CacheStore, EARLY_WARNING_KEY, MARITIME_KEY};
pub use client::{BmkgClient, Endpoints, WeatherSource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::WeatherError;
pub use normalize::{is_valid_raw_forecast, normalize_forecast, validate_raw_forecast};
pub use retry::{with_retry, RetryPolicy, AUXILIARY_RETRY, FORECAST_RETRY};
pub use service::{CacheTtls, WeatherService};
pub use storage::{probe_backend, CacheBackend, FileBackend, MemoryBackend};
pub use types::*;
