//! Maps pipeline and startup errors to cuaca_core::AppError for consistent user-facing messages.

use cuaca_core::{AppError, ConfigError, NetworkError, WeatherError as CoreWeatherError};
use cuaca_weather::WeatherError;

pub fn map_weather_error(e: WeatherError) -> AppError {
    match e {
        // The forecast endpoint answers 404 for an unknown adm4 code.
        WeatherError::Upstream {
            operation: "fetch_forecast",
            status: 404,
            endpoint,
        } => AppError::Weather(CoreWeatherError::RegionNotFound(endpoint)),
        WeatherError::Upstream {
            status, endpoint, ..
        } => AppError::Network(NetworkError::ServerError { status, endpoint }),
        WeatherError::Timeout { endpoint, .. } => AppError::Network(NetworkError::Timeout { endpoint }),
        WeatherError::Network { message, .. } => {
            AppError::Network(NetworkError::ConnectionFailed(message))
        }
        WeatherError::Parse { operation, message } => AppError::Network(
            NetworkError::InvalidResponse(format!("{}: {}", operation, message)),
        ),
        WeatherError::Validation(msg) => AppError::Weather(CoreWeatherError::InvalidData(msg)),
        WeatherError::Cache(_) => AppError::Weather(CoreWeatherError::ServiceUnavailable),
    }
}

/// Classify a startup failure (config load, service construction).
pub fn map_startup_error(e: anyhow::Error) -> AppError {
    let e = match e.downcast::<ConfigError>() {
        Ok(config) => return AppError::Config(config),
        Err(e) => e,
    };
    match e.downcast::<std::io::Error>() {
        Ok(io) => AppError::Io(io),
        Err(e) => AppError::Other(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_upstream_keeps_status() {
        let err = map_weather_error(WeatherError::Upstream {
            operation: "fetch_forecast",
            status: 500,
            endpoint: "https://api.test/prakiraan-cuaca?adm4=1".into(),
        });
        assert!(matches!(
            err,
            AppError::Network(NetworkError::ServerError { status: 500, .. })
        ));
        assert!(err.user_message().contains("server"));
    }

    #[test]
    fn test_timeout_maps_to_network_timeout() {
        let err = map_weather_error(WeatherError::Timeout {
            operation: "fetch_maritime",
            endpoint: "https://api.test/perairan".into(),
        });
        assert_eq!(err.user_message(), "The request timed out. Please try again.");
    }

    #[test]
    fn test_validation_maps_to_invalid_data() {
        let err = map_weather_error(WeatherError::Validation("no slots".into()));
        assert!(matches!(
            err,
            AppError::Weather(CoreWeatherError::InvalidData(_))
        ));
    }

    #[test]
    fn test_forecast_not_found_is_unknown_region() {
        let err = map_weather_error(WeatherError::Upstream {
            operation: "fetch_forecast",
            status: 404,
            endpoint: "https://api.test/prakiraan-cuaca?adm4=0000".into(),
        });
        assert!(matches!(
            err,
            AppError::Weather(CoreWeatherError::RegionNotFound(_))
        ));
        assert!(err.user_message().contains("Region not found"));
    }

    #[test]
    fn test_other_not_found_stays_network_error() {
        let err = map_weather_error(WeatherError::Upstream {
            operation: "fetch_maritime",
            status: 404,
            endpoint: "https://api.test/perairan".into(),
        });
        assert!(matches!(
            err,
            AppError::Network(NetworkError::ServerError { status: 404, .. })
        ));
    }

    #[test]
    fn test_startup_config_error_maps_to_config() {
        let err = map_startup_error(ConfigError::ParseError("bad toml".into()).into());
        assert!(matches!(err, AppError::Config(ConfigError::ParseError(_))));
        assert!(err.user_message().contains("malformed"));
    }

    #[test]
    fn test_startup_io_error_survives_context() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = map_startup_error(
            Err::<(), _>(io)
                .context("Failed to read config file")
                .unwrap_err(),
        );
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_startup_unknown_error_is_other() {
        let err = map_startup_error(anyhow::anyhow!("client builder failed"));
        assert!(matches!(err, AppError::Other(_)));
        assert_eq!(
            err.user_message(),
            "An unexpected error occurred. Please try again."
        );
    }
}
