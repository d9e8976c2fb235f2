use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::params::{build_url, Params};
use super::types::*;
use crate::config::Config;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("skycast/", env!("CARGO_PKG_VERSION"));

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Variables requested for the `current` block
pub const CURRENT_VARIABLES: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "apparent_temperature",
    "is_day",
    "precipitation",
    "weather_code",
    "cloud_cover",
    "pressure_msl",
    "wind_speed_10m",
    "wind_direction_10m",
    "wind_gusts_10m",
];

/// Hourly variables requested for forecasts
pub const FORECAST_HOURLY: &[&str] = &[
    "temperature_2m",
    "precipitation_probability",
    "precipitation",
    "weather_code",
    "wind_speed_10m",
];

/// Daily variables requested for forecasts and archives
pub const DAILY_VARIABLES: &[&str] = &[
    "weather_code",
    "temperature_2m_max",
    "temperature_2m_min",
    "temperature_2m_mean",
    "precipitation_sum",
    "precipitation_hours",
    "wind_speed_10m_max",
    "wind_gusts_10m_max",
];

/// Marine variables, requested both as current and hourly
pub const MARINE_VARIABLES: &[&str] = &[
    "wave_height",
    "wave_direction",
    "wave_period",
    "wind_wave_height",
    "swell_wave_height",
    "swell_wave_direction",
    "swell_wave_period",
    "sea_surface_temperature",
];

/// Air quality variables
pub const AIR_QUALITY_VARIABLES: &[&str] = &[
    "european_aqi",
    "us_aqi",
    "pm10",
    "pm2_5",
    "carbon_monoxide",
    "nitrogen_dioxide",
    "sulphur_dioxide",
    "ozone",
    "uv_index",
];

/// Daily flood variables
pub const FLOOD_VARIABLES: &[&str] = &[
    "river_discharge",
    "river_discharge_max",
    "river_discharge_min",
    "river_discharge_mean",
];

/// Endpoint URLs for each API domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub forecast: String,
    pub archive: String,
    pub marine: String,
    pub air_quality: String,
    pub flood: String,
    pub geocoding: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            forecast: "https://api.open-meteo.com/v1/forecast".to_string(),
            archive: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            marine: "https://marine-api.open-meteo.com/v1/marine".to_string(),
            air_quality: "https://air-quality-api.open-meteo.com/v1/air-quality".to_string(),
            flood: "https://flood-api.open-meteo.com/v1/flood".to_string(),
            geocoding: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every domain at one base URL (used for self-hosted instances and tests)
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            forecast: format!("{base}/v1/forecast"),
            archive: format!("{base}/v1/archive"),
            marine: format!("{base}/v1/marine"),
            air_quality: format!("{base}/v1/air-quality"),
            flood: format!("{base}/v1/flood"),
            geocoding: format!("{base}/v1/search"),
        }
    }
}

/// Open-Meteo API client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct WeatherApi {
    client: Client,
    endpoints: Endpoints,
    api_key: Option<String>,
}

impl WeatherApi {
    /// Create a new client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoints: config.api.endpoints(),
            api_key: config.api.api_key.clone(),
        })
    }

    /// Create a client with explicit endpoints and the default timeout
    pub fn with_endpoints(endpoints: Endpoints) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoints,
            api_key: None,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// GET a URL and decode its JSON body
    ///
    /// Non-2xx statuses and 2xx bodies carrying `"error": true` both become
    /// [`Error::Api`], keeping the server's `reason` when there is one.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::api(status.as_u16(), error_reason(&body)));
        }

        let value: serde_json::Value = serde_json::from_str(&body)?;
        if value.get("error").and_then(serde_json::Value::as_bool) == Some(true) {
            let reason = value
                .get("reason")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            return Err(Error::api(status.as_u16(), reason));
        }

        serde_json::from_value(value).map_err(Error::Json)
    }

    fn url(&self, base: &str, mut params: Params) -> String {
        if let Some(ref key) = self.api_key {
            params.push("apikey", key);
        }
        build_url(base, &params)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Forecast Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Current conditions for a location
    pub async fn current(&self, location: Coordinates, units: &Units) -> Result<WeatherResponse> {
        let params = location_params(location)
            .set("current", CURRENT_VARIABLES)
            .set_units(units);
        self.get_json(&self.url(&self.endpoints.forecast, params)).await
    }

    /// Hourly and daily forecast
    pub async fn forecast(&self, request: &ForecastRequest) -> Result<WeatherResponse> {
        let params = location_params(request.location)
            .set("current", CURRENT_VARIABLES)
            .set("hourly", non_empty(&request.hourly))
            .set("daily", non_empty(&request.daily))
            .set("forecast_days", request.days)
            .set_units(&request.units);
        self.get_json(&self.url(&self.endpoints.forecast, params)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Archive Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Daily observations for a past date range
    pub async fn historical(&self, request: &HistoricalRequest) -> Result<WeatherResponse> {
        let params = location_params(request.location)
            .set("start_date", request.start.format("%Y-%m-%d").to_string())
            .set("end_date", request.end.format("%Y-%m-%d").to_string())
            .set("daily", non_empty(&request.daily))
            .set_units(&request.units);
        self.get_json(&self.url(&self.endpoints.archive, params)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Marine, Flood and Air Quality Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Wave and swell conditions
    pub async fn marine(&self, location: Coordinates, units: &Units) -> Result<WeatherResponse> {
        let params = location_params(location)
            .set("current", MARINE_VARIABLES)
            .set("hourly", MARINE_VARIABLES)
            .set("forecast_days", 3_u32)
            .set("timezone", &units.timezone);
        self.get_json(&self.url(&self.endpoints.marine, params)).await
    }

    /// River discharge forecast
    pub async fn flood(&self, location: Coordinates, days: u32) -> Result<WeatherResponse> {
        let params = location_params(location)
            .set("daily", FLOOD_VARIABLES)
            .set("forecast_days", days);
        self.get_json(&self.url(&self.endpoints.flood, params)).await
    }

    /// Pollutant concentrations and indices
    pub async fn air_quality(&self, location: Coordinates, units: &Units) -> Result<WeatherResponse> {
        let params = location_params(location)
            .set("current", AIR_QUALITY_VARIABLES)
            .set("hourly", &["pm10", "pm2_5", "european_aqi"][..])
            .set("forecast_days", 1_u32)
            .set("timezone", &units.timezone);
        self.get_json(&self.url(&self.endpoints.air_quality, params)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Geocoding Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Search locations by name
    pub async fn search_locations(&self, name: &str, count: u32) -> Result<GeocodingResponse> {
        let params = Params::new()
            .set("name", name)
            .set("count", count)
            .set("language", "en")
            .set("format", "json");
        self.get_json(&self.url(&self.endpoints.geocoding, params)).await
    }
}

fn location_params(location: Coordinates) -> Params {
    Params::new()
        .set("latitude", location.latitude)
        .set("longitude", location.longitude)
}

fn non_empty(variables: &[String]) -> Option<Vec<String>> {
    (!variables.is_empty()).then(|| variables.to_vec())
}

trait UnitParams {
    fn set_units(self, units: &Units) -> Self;
}

impl UnitParams for Params {
    fn set_units(self, units: &Units) -> Self {
        self.set("temperature_unit", &units.temperature)
            .set("wind_speed_unit", &units.wind_speed)
            .set("precipitation_unit", &units.precipitation)
            .set("timezone", &units.timezone)
    }
}

/// Pull a human-readable reason out of an error body
fn error_reason(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(reason) = value.get("reason").and_then(serde_json::Value::as_str) {
            return Some(reason.to_string());
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.chars().take(500).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mockito::Matcher;

    fn api_for(server: &mockito::ServerGuard) -> WeatherApi {
        WeatherApi::with_endpoints(Endpoints::with_base(&server.url())).unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Error Classification Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_http_error_keeps_reason_from_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": true, "reason": "Latitude must be in range of -90 to 90°. Given: 91.0."}"#)
            .create_async()
            .await;

        let err = api_for(&server)
            .current(Coordinates::new(91.0, 1.0), &Units::default())
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            err.reason(),
            Some("Latitude must be in range of -90 to 90°. Given: 91.0.")
        );
    }

    #[tokio::test]
    async fn test_http_error_with_plain_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/flood")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("upstream unavailable\n")
            .create_async()
            .await;

        let err = api_for(&server)
            .flood(Coordinates::new(52.52, 13.41), 7)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(err.reason(), Some("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_http_error_with_empty_body_has_no_reason() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/marine")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let err = api_for(&server)
            .marine(Coordinates::new(54.32, 10.13), &Units::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api { status: 500, reason: None }));
    }

    #[tokio::test]
    async fn test_logical_error_on_success_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/archive")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": true, "reason": "Parameter 'start_date' is out of allowed range"}"#)
            .create_async()
            .await;

        let request = HistoricalRequest {
            location: Coordinates::new(52.52, 13.41),
            start: NaiveDate::from_ymd_opt(1900, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(1900, 1, 2).unwrap(),
            daily: vec!["temperature_2m_max".to_string()],
            units: Units::default(),
        };
        let err = api_for(&server).historical(&request).await.unwrap_err();

        assert_eq!(err.status(), Some(200));
        assert_eq!(err.reason(), Some("Parameter 'start_date' is out of allowed range"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = api_for(&server).search_locations("Berlin", 5).await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request Construction Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_forecast_request_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("latitude".into(), "52.52".into()),
                Matcher::UrlEncoded("longitude".into(), "13.41".into()),
                Matcher::UrlEncoded("hourly".into(), "temperature_2m,rain".into()),
                Matcher::UrlEncoded("forecast_days".into(), "3".into()),
                Matcher::UrlEncoded("timezone".into(), "auto".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"latitude": 52.52, "longitude": 13.419998,
                    "hourly": {"time": ["2024-06-01T00:00"], "temperature_2m": [14.2], "rain": [0.0]}}"#,
            )
            .create_async()
            .await;

        let request = ForecastRequest {
            location: Coordinates::new(52.52, 13.41),
            days: 3,
            hourly: vec!["temperature_2m".to_string(), "rain".to_string()],
            daily: Vec::new(),
            units: Units::default(),
        };
        let response = api_for(&server).forecast(&request).await.unwrap();

        mock.assert_async().await;
        let hourly = response.hourly.unwrap();
        assert_eq!(hourly.value("temperature_2m", 0), Some(14.2));
        assert_eq!(hourly.value("rain", 0), Some(0.0));
    }

    #[tokio::test]
    async fn test_geocoding_search_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("name".into(), "São Paulo".into()),
                Matcher::UrlEncoded("count".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"results": [{"id": 3448439, "name": "São Paulo", "latitude": -23.5475,
                    "longitude": -46.63611, "country": "Brazil"}]}"#,
            )
            .create_async()
            .await;

        let response = api_for(&server).search_locations("São Paulo", 5).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].country.as_deref(), Some("Brazil"));
    }

    #[test]
    fn test_error_reason_prefers_json_reason() {
        assert_eq!(
            error_reason(r#"{"error": true, "reason": "bad"}"#),
            Some("bad".to_string())
        );
        assert_eq!(error_reason("  "), None);
        assert_eq!(error_reason("oops"), Some("oops".to_string()));
    }

    #[test]
    fn test_endpoints_with_base_trims_slash() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:1234/");
        assert_eq!(endpoints.forecast, "http://127.0.0.1:1234/v1/forecast");
        assert_eq!(endpoints.geocoding, "http://127.0.0.1:1234/v1/search");
    }
}
