//! Raw upstream forecast -> fixed 3-day x 8-slot [`ForecastResponse`].
//!
//! Pure: no I/O, no state. The caller supplies `generated_at`.

use chrono::{DateTime, Utc};

use crate::error::WeatherError;
use crate::types::{
    DailyForecast, ForecastResponse, ForecastSlot, RawForecastPayload, RawForecastSlot,
    WeatherDescription, FORECAST_DAYS, MAX_FORECAST_SLOTS, SLOTS_PER_DAY,
};

const OPERATION: &str = "normalize_forecast";

/// Minimum-shape check: non-empty slot list, a location block, and a first
/// record carrying every required field.
pub fn validate_raw_forecast(raw: &RawForecastPayload) -> Result<(), WeatherError> {
    let Some(first) = raw.data.first() else {
        return Err(WeatherError::Validation("forecast has no slots".into()));
    };
    if raw.lokasi.is_none() {
        return Err(WeatherError::Validation("forecast has no location block".into()));
    }

    let missing = missing_required_fields(first);
    if !missing.is_empty() {
        return Err(WeatherError::Validation(format!(
            "first forecast slot is missing: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

pub fn is_valid_raw_forecast(raw: &RawForecastPayload) -> bool {
    validate_raw_forecast(raw).is_ok()
}

fn missing_required_fields(slot: &RawForecastSlot) -> Vec<&'static str> {
    let checks = [
        ("local_datetime", slot.local_datetime.is_some()),
        ("t", slot.t.is_some()),
        ("hu", slot.hu.is_some()),
        ("weather_desc", slot.weather_desc.is_some()),
        ("weather_desc_en", slot.weather_desc_en.is_some()),
        ("ws", slot.ws.is_some()),
        ("wd", slot.wd.is_some()),
    ];
    checks
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect()
}

fn required<T>(value: Option<T>, index: usize, field: &str) -> Result<T, WeatherError> {
    value.ok_or_else(|| WeatherError::Parse {
        operation: OPERATION,
        message: format!("slot {} is missing `{}`", index, field),
    })
}

/// Field-by-field translation; no unit conversion.
fn map_slot(index: usize, raw: RawForecastSlot) -> Result<ForecastSlot, WeatherError> {
    Ok(ForecastSlot {
        timestamp: required(raw.local_datetime, index, "local_datetime")?,
        temperature: required(raw.t, index, "t")?,
        humidity: required(raw.hu, index, "hu")?,
        wind_speed: required(raw.ws, index, "ws")?,
        wind_direction: required(raw.wd, index, "wd")?,
        cloud_cover: raw.tcc,
        visibility: raw.vs_text,
        description: WeatherDescription {
            primary: required(raw.weather_desc, index, "weather_desc")?,
            secondary: required(raw.weather_desc_en, index, "weather_desc_en")?,
        },
        weather_icon_id: raw.image,
    })
}

/// Normalize an upstream payload.
///
/// Keeps at most the first 24 slots and groups them into consecutive days of
/// eight; a short payload yields fewer or shorter days, never padded ones.
/// Does not re-run [`validate_raw_forecast`]: a slot missing a required field
/// fails with [`WeatherError::Parse`].
pub fn normalize_forecast(
    raw: RawForecastPayload,
    generated_at: DateTime<Utc>,
) -> Result<ForecastResponse, WeatherError> {
    let total_forecast_count = raw.data.len();

    let slots = raw
        .data
        .into_iter()
        .take(MAX_FORECAST_SLOTS)
        .enumerate()
        .map(|(index, slot)| map_slot(index, slot))
        .collect::<Result<Vec<_>, _>>()?;

    let daily_forecasts: Vec<DailyForecast> = slots
        .chunks(SLOTS_PER_DAY)
        .take(FORECAST_DAYS)
        .map(|chunk| DailyForecast {
            slots: chunk.to_vec(),
        })
        .collect();

    Ok(ForecastResponse {
        location: raw.lokasi.unwrap_or_default(),
        daily_forecasts,
        total_forecast_count,
        generated_at,
    })
}
