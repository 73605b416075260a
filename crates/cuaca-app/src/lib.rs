//! Application layer for Cuaca: wires the weather pipeline from configuration
//! and holds the last-fetched results for display.

pub mod error_mapping;
pub mod services;
pub mod weather_state;

pub use error_mapping::{map_startup_error, map_weather_error};
pub use services::build_weather_service;
pub use weather_state::{request_refresh, RefreshSummary, WeatherServiceMessage, WeatherSnapshot, WeatherState};
