use chrono::NaiveDate;

use super::valid_location;
use crate::api::{
    Coordinates, ForecastRequest, HistoricalRequest, Units, WeatherApi, WeatherResponse,
    DAILY_VARIABLES, FORECAST_HOURLY,
};
use crate::query::{keys, Category, QueryRequest};

/// Longest forecast the API serves
pub const MAX_FORECAST_DAYS: u32 = 16;
/// Flood forecast horizon used by the CLI
pub const DEFAULT_FLOOD_DAYS: u32 = 7;

fn variables(list: &[&str]) -> Vec<String> {
    list.iter().map(|v| v.to_string()).collect()
}

pub fn current_weather_query(
    api: &WeatherApi,
    location: Option<Coordinates>,
    units: &Units,
) -> Option<QueryRequest<WeatherResponse>> {
    let location = valid_location(location)?;
    let api = api.clone();
    let units = units.clone();
    Some(QueryRequest::new(
        keys::weather::current(location, &units),
        Category::Current.policy(),
        move || {
            let api = api.clone();
            let units = units.clone();
            async move { api.current(location, &units).await }
        },
    ))
}

/// Days outside `1..=16` are clamped
pub fn forecast_query(
    api: &WeatherApi,
    location: Option<Coordinates>,
    days: u32,
    units: &Units,
) -> Option<QueryRequest<WeatherResponse>> {
    let request = ForecastRequest {
        location: valid_location(location)?,
        days: days.clamp(1, MAX_FORECAST_DAYS),
        hourly: variables(FORECAST_HOURLY),
        daily: variables(DAILY_VARIABLES),
        units: units.clone(),
    };
    let api = api.clone();
    Some(QueryRequest::new(
        keys::weather::forecast(&request),
        Category::Forecast.policy(),
        move || {
            let api = api.clone();
            let request = request.clone();
            async move { api.forecast(&request).await }
        },
    ))
}

/// Disabled until both dates are set and `start <= end`
pub fn historical_query(
    api: &WeatherApi,
    location: Option<Coordinates>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    units: &Units,
) -> Option<QueryRequest<WeatherResponse>> {
    let request = HistoricalRequest {
        location: valid_location(location)?,
        start: start?,
        end: end?,
        daily: variables(DAILY_VARIABLES),
        units: units.clone(),
    };
    if !request.is_valid_range() {
        return None;
    }
    let api = api.clone();
    Some(QueryRequest::new(
        keys::historical::request(&request),
        Category::Historical.policy(),
        move || {
            let api = api.clone();
            let request = request.clone();
            async move { api.historical(&request).await }
        },
    ))
}

pub fn marine_query(
    api: &WeatherApi,
    location: Option<Coordinates>,
    units: &Units,
) -> Option<QueryRequest<WeatherResponse>> {
    let location = valid_location(location)?;
    let api = api.clone();
    let units = units.clone();
    Some(QueryRequest::new(
        keys::marine::conditions(location, &units),
        Category::Marine.policy(),
        move || {
            let api = api.clone();
            let units = units.clone();
            async move { api.marine(location, &units).await }
        },
    ))
}

pub fn flood_query(
    api: &WeatherApi,
    location: Option<Coordinates>,
    days: u32,
) -> Option<QueryRequest<WeatherResponse>> {
    let location = valid_location(location)?;
    let days = days.max(1);
    let api = api.clone();
    Some(QueryRequest::new(
        keys::flood::discharge(location, days),
        Category::Flood.policy(),
        move || {
            let api = api.clone();
            async move { api.flood(location, days).await }
        },
    ))
}

pub fn air_quality_query(
    api: &WeatherApi,
    location: Option<Coordinates>,
    units: &Units,
) -> Option<QueryRequest<WeatherResponse>> {
    let location = valid_location(location)?;
    let api = api.clone();
    let units = units.clone();
    Some(QueryRequest::new(
        keys::air_quality::current(location, &units),
        Category::AirQuality.policy(),
        move || {
            let api = api.clone();
            let units = units.clone();
            async move { api.air_quality(location, &units).await }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Endpoints;
    use crate::hooks::Hooks;
    use crate::query::{ClientOptions, QueryClient, QueryStatus, RetryPolicy};
    use mockito::Matcher;

    const BERLIN: Coordinates = Coordinates {
        latitude: 52.52,
        longitude: 13.41,
    };

    fn offline_api() -> WeatherApi {
        // Nothing listens here; disabled hooks must never get this far
        WeatherApi::with_endpoints(Endpoints::with_base("http://127.0.0.1:9")).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Guard Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_invalid_locations_disable_queries() {
        let api = offline_api();
        let units = Units::default();
        for location in [
            None,
            Some(Coordinates::new(0.0, 0.0)),
            Some(Coordinates::new(f64::NAN, 13.41)),
            Some(Coordinates::new(52.52, f64::INFINITY)),
            Some(Coordinates::new(95.0, 13.41)),
        ] {
            assert!(current_weather_query(&api, location, &units).is_none());
            assert!(forecast_query(&api, location, 7, &units).is_none());
            assert!(marine_query(&api, location, &units).is_none());
            assert!(flood_query(&api, location, 7).is_none());
            assert!(air_quality_query(&api, location, &units).is_none());
        }
        assert!(current_weather_query(&api, Some(BERLIN), &units).is_some());
    }

    #[test]
    fn test_historical_range_guard() {
        let api = offline_api();
        let units = Units::default();
        let loc = Some(BERLIN);

        assert!(historical_query(&api, loc, Some(date(2024, 1, 31)), Some(date(2024, 1, 1)), &units).is_none());
        assert!(historical_query(&api, loc, None, Some(date(2024, 1, 1)), &units).is_none());
        assert!(historical_query(&api, loc, Some(date(2024, 1, 1)), None, &units).is_none());
        assert!(historical_query(&api, loc, Some(date(2024, 1, 1)), Some(date(2024, 1, 1)), &units).is_some());
    }

    #[test]
    fn test_forecast_days_are_clamped() {
        let api = offline_api();
        let units = Units::default();
        let long = forecast_query(&api, Some(BERLIN), 40, &units).unwrap();
        let max = forecast_query(&api, Some(BERLIN), MAX_FORECAST_DAYS, &units).unwrap();
        let zero = forecast_query(&api, Some(BERLIN), 0, &units).unwrap();
        let one = forecast_query(&api, Some(BERLIN), 1, &units).unwrap();

        assert_eq!(long.key(), max.key());
        assert_eq!(zero.key(), one.key());
    }

    #[test]
    fn test_queries_carry_category_policies() {
        let api = offline_api();
        let units = Units::default();
        let current = current_weather_query(&api, Some(BERLIN), &units).unwrap();
        let historical =
            historical_query(&api, Some(BERLIN), Some(date(2024, 1, 1)), Some(date(2024, 1, 31)), &units).unwrap();

        assert_eq!(current.policy(), Category::Current.policy());
        assert_eq!(historical.policy(), Category::Historical.policy());
    }

    #[tokio::test]
    async fn test_disabled_hook_creates_no_entry() {
        let client = QueryClient::new(ClientOptions::default());
        let hooks = Hooks::new(client.clone(), offline_api());

        let observer = hooks.use_current_weather(Some(Coordinates::new(0.0, 0.0)), &Units::default());
        assert!(!observer.is_enabled());
        assert_eq!(observer.state().status, QueryStatus::Idle);
        assert!(client.is_empty());

        hooks.prefetch_forecast(Coordinates::new(0.0, 0.0), 7, &Units::default()).await;
        assert!(client.is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fetch Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_two_forecast_consumers_share_one_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::UrlEncoded("latitude".into(), "52.52".into()))
            .with_status(200)
            .with_body(r#"{"latitude": 52.52, "longitude": 13.41, "daily": {"time": ["2024-06-01"], "temperature_2m_max": [24.1]}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = QueryClient::new(ClientOptions::default());
        let api = WeatherApi::with_endpoints(Endpoints::with_base(&server.url())).unwrap();
        let hooks = Hooks::new(client.clone(), api);
        let units = Units::default();

        let first = hooks.use_forecast(Some(BERLIN), 7, &units);
        let second = hooks.use_forecast(Some(BERLIN), 7, &units);
        let a = first.settled().await;
        let b = second.settled().await;

        mock.assert_async().await;
        assert!(a.is_success());
        assert_eq!(a.data, b.data);
        assert_eq!(client.subscriber_count(first.key().unwrap()), 2);
    }

    #[tokio::test]
    async fn test_api_failure_becomes_error_state() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/marine")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": true, "reason": "No marine data for this location"}"#)
            .create_async()
            .await;

        let client = QueryClient::new(ClientOptions {
            retry: RetryPolicy::none(),
        });
        let api = WeatherApi::with_endpoints(Endpoints::with_base(&server.url())).unwrap();
        let hooks = Hooks::new(client, api);

        let state = hooks.use_marine(Some(BERLIN), &Units::default()).settled().await;
        assert_eq!(state.status, QueryStatus::Error);
        assert!(state.data.is_none());
        assert_eq!(
            state.error.unwrap().reason(),
            Some("No marine data for this location")
        );
    }

    #[tokio::test]
    async fn test_prefetch_then_hook_reads_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"current": {"time": "2024-06-01T12:00", "temperature_2m": 21.5}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = QueryClient::new(ClientOptions::default());
        let api = WeatherApi::with_endpoints(Endpoints::with_base(&server.url())).unwrap();
        let hooks = Hooks::new(client.clone(), api);
        let units = Units::default();

        hooks.prefetch_current_weather(BERLIN, &units).await;
        let observer = hooks.use_current_weather(Some(BERLIN), &units);
        let state = observer.state();

        mock.assert_async().await;
        assert!(state.is_success());
        assert!(!state.is_fetching);
        let current = state.data.unwrap().current.clone().unwrap();
        assert_eq!(current.value("temperature_2m"), Some(21.5));
    }
}
