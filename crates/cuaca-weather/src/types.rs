use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Days in a normalized forecast
pub const FORECAST_DAYS: usize = 3;

/// Three-hour slots per day
pub const SLOTS_PER_DAY: usize = 8;

/// Upper bound on slots kept from the upstream payload
pub const MAX_FORECAST_SLOTS: usize = FORECAST_DAYS * SLOTS_PER_DAY;

/// Administrative region block (`lokasi`) as supplied by upstream.
///
/// Known fields are typed; anything else upstream sends is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adm1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adm2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adm3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adm4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provinsi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kotkab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kecamatan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RegionLocation {
    /// Most specific place name available, e.g. the village before the province.
    pub fn display_name(&self) -> Option<&str> {
        self.desa
            .as_deref()
            .or(self.kecamatan.as_deref())
            .or(self.kotkab.as_deref())
            .or(self.provinsi.as_deref())
            .or(self.adm1.as_deref())
    }
}

/// One upstream forecast record, exactly as the API names its fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawForecastSlot {
    #[serde(default)]
    pub local_datetime: Option<String>,
    #[serde(default)]
    pub t: Option<f64>,
    #[serde(default)]
    pub hu: Option<f64>,
    #[serde(default)]
    pub weather_desc: Option<String>,
    #[serde(default)]
    pub weather_desc_en: Option<String>,
    #[serde(default)]
    pub ws: Option<f64>,
    #[serde(default)]
    pub wd: Option<String>,
    #[serde(default)]
    pub tcc: Option<f64>,
    #[serde(default)]
    pub vs_text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Un-normalized forecast body: a flat list of slots plus a location block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawForecastPayload {
    #[serde(default)]
    pub data: Vec<RawForecastSlot>,
    #[serde(default)]
    pub lokasi: Option<RegionLocation>,
}

/// Weather description in the primary (Indonesian) and secondary (English) language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherDescription {
    pub primary: String,
    pub secondary: String,
}

/// One 3-hour forecast interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSlot {
    /// Local timestamp as sent by upstream (`YYYY-MM-DD HH:MM:SS`)
    pub timestamp: String,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: String,
    /// Total cloud cover, percent
    pub cloud_cover: Option<f64>,
    pub visibility: Option<String>,
    pub description: WeatherDescription,
    pub weather_icon_id: Option<String>,
}

/// Up to eight consecutive slots covering one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub slots: Vec<ForecastSlot>,
}

impl DailyForecast {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True when the day carries a full set of eight slots.
    pub fn is_complete(&self) -> bool {
        self.slots.len() == SLOTS_PER_DAY
    }

    /// (min, max) temperature over the day's slots.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        let mut temps = self.slots.iter().map(|s| s.temperature);
        let first = temps.next()?;
        Some(temps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }
}

/// Normalized forecast for one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub location: RegionLocation,
    pub daily_forecasts: Vec<DailyForecast>,
    /// Slot count reported by upstream before capping, kept for diagnostics
    pub total_forecast_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl ForecastResponse {
    /// All slots across days, in order.
    pub fn slots(&self) -> impl Iterator<Item = &ForecastSlot> {
        self.daily_forecasts.iter().flat_map(|d| d.slots.iter())
    }
}

/// Early-warning payload, passed through exactly as upstream sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EarlyWarning(pub serde_json::Value);

impl EarlyWarning {
    pub fn raw(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Maritime payload, passed through exactly as upstream sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaritimeData(pub serde_json::Value);

impl MaritimeData {
    pub fn raw(&self) -> &serde_json::Value {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(temp: f64) -> ForecastSlot {
        ForecastSlot {
            timestamp: "2024-06-01 07:00:00".into(),
            temperature: temp,
            humidity: 80.0,
            wind_speed: 5.2,
            wind_direction: "SE".into(),
            cloud_cover: Some(40.0),
            visibility: Some("> 10 km".into()),
            description: WeatherDescription {
                primary: "Cerah Berawan".into(),
                secondary: "Partly Cloudy".into(),
            },
            weather_icon_id: None,
        }
    }

    #[test]
    fn test_raw_payload_deserializes_upstream_shape() {
        let json = serde_json::json!({
            "lokasi": {"adm1": "31", "provinsi": "DKI Jakarta", "lat": -6.2, "type": "adm4"},
            "data": [{
                "local_datetime": "2024-06-01 07:00:00",
                "t": 27, "hu": 85, "weather_desc": "Berawan",
                "weather_desc_en": "Mostly Cloudy", "ws": 4.3, "wd": "W",
                "tcc": 75, "vs_text": "> 10 km", "image": "https://example.test/b.svg"
            }]
        });

        let raw: RawForecastPayload = serde_json::from_value(json).unwrap();
        assert_eq!(raw.data.len(), 1);
        assert_eq!(raw.data[0].t, Some(27.0));
        let lokasi = raw.lokasi.unwrap();
        assert_eq!(lokasi.provinsi.as_deref(), Some("DKI Jakarta"));
        assert_eq!(lokasi.extra.get("type"), Some(&serde_json::json!("adm4")));
    }

    #[test]
    fn test_temperature_range() {
        let day = DailyForecast {
            slots: vec![slot(26.0), slot(31.5), slot(24.0)],
        };
        assert_eq!(day.temperature_range(), Some((24.0, 31.5)));
        assert!(!day.is_complete());

        let empty = DailyForecast { slots: vec![] };
        assert_eq!(empty.temperature_range(), None);
    }

    #[test]
    fn test_display_name_prefers_most_specific() {
        let loc = RegionLocation {
            provinsi: Some("DKI Jakarta".into()),
            desa: Some("Gambir".into()),
            ..Default::default()
        };
        assert_eq!(loc.display_name(), Some("Gambir"));
        assert_eq!(RegionLocation::default().display_name(), None);
    }

    #[test]
    fn test_passthrough_payload_is_transparent() {
        let value = serde_json::json!({"Infogempa": {"gempa": {"Magnitude": "5.1"}}});
        let warning: EarlyWarning = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(warning.raw(), &value);
        assert_eq!(serde_json::to_value(&warning).unwrap(), value);
    }
}
