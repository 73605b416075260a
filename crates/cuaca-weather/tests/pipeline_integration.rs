//! End-to-end tests: WeatherService over a real BmkgClient, a mock upstream
//! and a file-backed cache in a temporary directory.

use std::sync::Arc;

use cuaca_weather::{
    forecast_key, BmkgClient, CacheStore, Endpoints, FileBackend, RetryPolicy, SystemClock,
    WeatherError, WeatherService,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REGION: &str = "3171031001";

fn slot(i: usize) -> serde_json::Value {
    serde_json::json!({
        "local_datetime": format!("2024-06-0{} {:02}:00:00", 1 + i / 8, (i % 8) * 3),
        "t": 25 + (i % 8),
        "hu": 70 + i,
        "weather_desc": "Cerah Berawan",
        "weather_desc_en": "Partly Cloudy",
        "ws": 4.2,
        "wd": "NW",
        "tcc": 40,
        "vs_text": "> 10 km",
        "image": "https://example.test/icons/cerah-berawan-am.svg"
    })
}

fn forecast_body(slots: usize) -> serde_json::Value {
    serde_json::json!({
        "lokasi": {
            "adm1": "DKI Jakarta",
            "adm4": "31.71.03.1001",
            "provinsi": "DKI Jakarta",
            "kotkab": "Kota Adm. Jakarta Pusat",
            "kecamatan": "Kemayoran",
            "desa": "Gunung Sahari Selatan",
            "lat": -6.16,
            "lon": 106.84
        },
        "data": (0..slots).map(slot).collect::<Vec<_>>()
    })
}

async fn service_for(server: &MockServer, cache_dir: &std::path::Path) -> WeatherService {
    let client = BmkgClient::new(Endpoints::single(&server.uri())).unwrap();
    let backend = FileBackend::open(cache_dir).await.unwrap();
    let cache = Arc::new(CacheStore::new(Arc::new(backend), Arc::new(SystemClock)));

    // Short delays keep the suite fast; attempt counts match production.
    WeatherService::new(Arc::new(client), cache, Arc::new(SystemClock)).with_retry_policies(
        RetryPolicy::from_millis(3, 10),
        RetryPolicy::from_millis(2, 5),
    )
}

#[tokio::test]
async fn test_forecast_end_to_end() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/prakiraan-cuaca"))
        .and(query_param("adm4", REGION))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(24)))
        .expect(1)
        .mount(&server)
        .await;

    let svc = service_for(&server, dir.path()).await;
    let forecast = svc.forecast(REGION).await.unwrap();

    assert_eq!(forecast.daily_forecasts.len(), 3);
    assert!(forecast.daily_forecasts.iter().all(|d| d.len() == 8));
    assert_eq!(forecast.location.adm1.as_deref(), Some("DKI Jakarta"));
    assert_eq!(forecast.total_forecast_count, 24);

    let entry = svc.cache().entry(&forecast_key(REGION)).await.unwrap();
    assert_eq!(entry.ttl, 1_800_000);
    assert!(dir.path().join("forecast_3171031001.json").exists());

    // Served from cache: the mock's expect(1) is verified on drop.
    let again = svc.forecast(REGION).await.unwrap();
    assert_eq!(again, forecast);
}

#[tokio::test]
async fn test_forecast_failure_end_to_end() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/prakiraan-cuaca"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let svc = service_for(&server, dir.path()).await;
    let err = svc.forecast(REGION).await.unwrap_err();

    assert!(matches!(err, WeatherError::Upstream { status: 500, .. }), "got {:?}", err);
    assert!(svc.cache().entry(&forecast_key(REGION)).await.is_none());
    assert!(!dir.path().join("forecast_3171031001.json").exists());
}

#[tokio::test]
async fn test_cache_survives_service_restart() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/perairan"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([{"wilayah": "Laut Jawa"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let first = service_for(&server, dir.path()).await;
    first.maritime().await.unwrap();
    drop(first);

    let second = service_for(&server, dir.path()).await;
    let data = second.maritime().await.unwrap();
    assert_eq!(data.raw()[0]["wilayah"], "Laut Jawa");
}

#[tokio::test]
async fn test_concurrent_fetches_are_independent() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/prakiraan-cuaca"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(24)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/autogempa.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/perairan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let svc = service_for(&server, dir.path()).await;
    let (forecast, warnings, maritime) =
        tokio::join!(svc.forecast(REGION), svc.early_warnings(), svc.maritime());

    assert!(forecast.is_ok());
    assert_eq!(warnings.unwrap_err().status(), Some(503));
    assert!(maritime.is_ok());

    let stats = svc.cache_stats().await;
    assert_eq!(stats.backend, "file");
    assert_eq!(stats.entries, 2);
}
