//! Weather state holder: the last-known-good pipeline results for display.
//! Failed fetches never clear what is already shown; they only set an error message.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cuaca_core::AppError;
use cuaca_weather::{EarlyWarning, ForecastResponse, MaritimeData, WeatherError, WeatherService};
use parking_lot::RwLock;

use crate::error_mapping::map_weather_error;

/// What the dashboard currently shows
#[derive(Debug, Clone, Default)]
pub struct WeatherSnapshot {
    /// Region of `forecast`
    pub region: Option<String>,
    pub forecast: Option<ForecastResponse>,
    pub early_warning: Option<EarlyWarning>,
    pub maritime: Option<MaritimeData>,
    /// User-facing message from the most recent failure
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Which parts of a refresh succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshSummary {
    pub forecast_ok: bool,
    pub warnings_ok: bool,
    pub maritime_ok: bool,
}

impl RefreshSummary {
    pub fn all_ok(&self) -> bool {
        self.forecast_ok && self.warnings_ok && self.maritime_ok
    }
}

/// Messages sent from async operations back to the UI thread
#[derive(Debug)]
pub enum WeatherServiceMessage {
    RefreshDone(RefreshSummary),
    /// No async runtime was available to run the refresh
    NotInitialized,
}

pub struct WeatherState {
    service: Arc<WeatherService>,
    snapshot: RwLock<WeatherSnapshot>,
}

impl WeatherState {
    pub fn new(service: Arc<WeatherService>) -> Self {
        Self {
            service,
            snapshot: RwLock::new(WeatherSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> WeatherSnapshot {
        self.snapshot.read().clone()
    }

    pub async fn fetch_forecast(&self, region_code: &str) -> Result<ForecastResponse, AppError> {
        let result = self.service.forecast(region_code).await;
        let mut snap = self.snapshot.write();
        match result {
            Ok(forecast) => {
                snap.region = Some(region_code.to_string());
                snap.forecast = Some(forecast.clone());
                mark_success(&mut snap);
                Ok(forecast)
            }
            Err(e) => Err(record_failure(&mut snap, "forecast", e)),
        }
    }

    pub async fn fetch_early_warnings(&self) -> Result<EarlyWarning, AppError> {
        let result = self.service.early_warnings().await;
        let mut snap = self.snapshot.write();
        match result {
            Ok(warning) => {
                snap.early_warning = Some(warning.clone());
                mark_success(&mut snap);
                Ok(warning)
            }
            Err(e) => Err(record_failure(&mut snap, "early warnings", e)),
        }
    }

    pub async fn fetch_maritime(&self) -> Result<MaritimeData, AppError> {
        let result = self.service.maritime().await;
        let mut snap = self.snapshot.write();
        match result {
            Ok(maritime) => {
                snap.maritime = Some(maritime.clone());
                mark_success(&mut snap);
                Ok(maritime)
            }
            Err(e) => Err(record_failure(&mut snap, "maritime", e)),
        }
    }

    /// Fetch all three kinds concurrently and apply the results together.
    pub async fn refresh_all(&self, region_code: &str) -> RefreshSummary {
        let (forecast, warning, maritime) = tokio::join!(
            self.service.forecast(region_code),
            self.service.early_warnings(),
            self.service.maritime()
        );

        let mut summary = RefreshSummary::default();
        let mut snap = self.snapshot.write();
        snap.last_error = None;

        match forecast {
            Ok(forecast) => {
                snap.region = Some(region_code.to_string());
                snap.forecast = Some(forecast);
                summary.forecast_ok = true;
            }
            Err(e) => {
                record_failure(&mut snap, "forecast", e);
            }
        }
        match warning {
            Ok(warning) => {
                snap.early_warning = Some(warning);
                summary.warnings_ok = true;
            }
            Err(e) => {
                record_failure(&mut snap, "early warnings", e);
            }
        }
        match maritime {
            Ok(maritime) => {
                snap.maritime = Some(maritime);
                summary.maritime_ok = true;
            }
            Err(e) => {
                record_failure(&mut snap, "maritime", e);
            }
        }

        if summary.forecast_ok || summary.warnings_ok || summary.maritime_ok {
            snap.updated_at = Some(Utc::now());
        }
        tracing::info!("Weather refresh for {} finished: {:?}", region_code, summary);
        summary
    }

    pub async fn clear_cache(&self) {
        self.service.clear_cache().await;
    }

    pub async fn clear_expired_cache(&self) -> usize {
        self.service.clear_expired_cache().await
    }
}

fn mark_success(snap: &mut WeatherSnapshot) {
    snap.last_error = None;
    snap.updated_at = Some(Utc::now());
}

fn record_failure(snap: &mut WeatherSnapshot, what: &str, e: WeatherError) -> AppError {
    tracing::warn!("Failed to fetch {}: {}", what, e);
    let err = map_weather_error(e);
    snap.last_error = Some(err.user_message().to_string());
    err
}

/// Request a full refresh on the current tokio runtime.
/// Sends `RefreshDone` on the channel when complete.
pub fn request_refresh(
    tx: &std::sync::mpsc::Sender<WeatherServiceMessage>,
    state: Arc<WeatherState>,
    region_code: String,
) {
    let tx = tx.clone();
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(h) => h,
        Err(_) => {
            let _ = tx.send(WeatherServiceMessage::NotInitialized);
            return;
        }
    };

    handle.spawn(async move {
        let summary = state.refresh_all(&region_code).await;
        let _ = tx.send(WeatherServiceMessage::RefreshDone(summary));
    });
}
