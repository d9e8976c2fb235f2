//! Category query hooks
//!
//! Each hook binds a category's fetch function, key and cache policy into a
//! [`QueryObserver`]. Hooks own the disabling guard: when identifying
//! parameters are missing or invalid the observer is created disabled and
//! nothing is looked up or fetched.

mod geocoding;
mod weather;

pub use geocoding::{location_search_query, MIN_SEARCH_CHARS, SEARCH_RESULT_COUNT};
pub use weather::{
    air_quality_query, current_weather_query, flood_query, forecast_query, historical_query,
    marine_query, DEFAULT_FLOOD_DAYS, MAX_FORECAST_DAYS,
};

use chrono::NaiveDate;

use crate::api::{Coordinates, GeocodingResponse, Units, WeatherApi, WeatherResponse};
use crate::query::{ObserverOptions, QueryClient, QueryObserver, QueryRequest};

/// The cache and API client every hook works against
#[derive(Debug, Clone)]
pub struct Hooks {
    client: QueryClient,
    api: WeatherApi,
}

impl Hooks {
    pub fn new(client: QueryClient, api: WeatherApi) -> Self {
        Self { client, api }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn api(&self) -> &WeatherApi {
        &self.api
    }

    fn observe<T: Send + Sync + 'static>(
        &self,
        options: ObserverOptions,
        request: Option<QueryRequest<T>>,
    ) -> QueryObserver<T> {
        QueryObserver::with_request(&self.client, options, request)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Weather
    // ─────────────────────────────────────────────────────────────────────────

    pub fn use_current_weather(
        &self,
        location: Option<Coordinates>,
        units: &Units,
    ) -> QueryObserver<WeatherResponse> {
        self.observe(
            ObserverOptions::default(),
            current_weather_query(&self.api, location, units),
        )
    }

    pub fn use_forecast(
        &self,
        location: Option<Coordinates>,
        days: u32,
        units: &Units,
    ) -> QueryObserver<WeatherResponse> {
        self.observe(
            ObserverOptions::default(),
            forecast_query(&self.api, location, days, units),
        )
    }

    pub fn use_historical(
        &self,
        location: Option<Coordinates>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        units: &Units,
    ) -> QueryObserver<WeatherResponse> {
        self.observe(
            ObserverOptions::default(),
            historical_query(&self.api, location, start, end, units),
        )
    }

    pub fn use_marine(&self, location: Option<Coordinates>, units: &Units) -> QueryObserver<WeatherResponse> {
        self.observe(ObserverOptions::default(), marine_query(&self.api, location, units))
    }

    pub fn use_flood(&self, location: Option<Coordinates>, days: u32) -> QueryObserver<WeatherResponse> {
        self.observe(ObserverOptions::default(), flood_query(&self.api, location, days))
    }

    pub fn use_air_quality(
        &self,
        location: Option<Coordinates>,
        units: &Units,
    ) -> QueryObserver<WeatherResponse> {
        self.observe(
            ObserverOptions::default(),
            air_quality_query(&self.api, location, units),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Geocoding
    // ─────────────────────────────────────────────────────────────────────────

    /// Location search that keeps the previous results visible while the
    /// next search text loads. Feed later keystrokes through
    /// [`search`](Self::search).
    pub fn use_location_search(&self, text: &str) -> QueryObserver<GeocodingResponse> {
        self.observe(
            ObserverOptions {
                keep_previous_data: true,
            },
            location_search_query(&self.api, text),
        )
    }

    /// Point an existing search observer at new text
    pub fn search(&self, observer: &mut QueryObserver<GeocodingResponse>, text: &str) {
        observer.set_query(location_search_query(&self.api, text));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Prefetch
    // ─────────────────────────────────────────────────────────────────────────

    /// Warm the forecast for a location, e.g. on hover. Invalid locations
    /// are ignored.
    pub async fn prefetch_forecast(&self, location: Coordinates, days: u32, units: &Units) {
        if let Some(request) = forecast_query(&self.api, Some(location), days, units) {
            request.prefetch(&self.client).await;
        }
    }

    pub async fn prefetch_current_weather(&self, location: Coordinates, units: &Units) {
        if let Some(request) = current_weather_query(&self.api, Some(location), units) {
            request.prefetch(&self.client).await;
        }
    }
}

/// The coordinates when they identify a real location
fn valid_location(location: Option<Coordinates>) -> Option<Coordinates> {
    location.filter(Coordinates::is_valid)
}
