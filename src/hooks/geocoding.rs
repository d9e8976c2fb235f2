use crate::api::{GeocodingResponse, WeatherApi};
use crate::query::{keys, Category, QueryRequest};

/// Shortest search text that is sent to the geocoder
pub const MIN_SEARCH_CHARS: usize = 2;
/// Results requested per search
pub const SEARCH_RESULT_COUNT: u32 = 10;

/// Search by place name; disabled for text shorter than two non-blank
/// characters. Leading and trailing whitespace is ignored.
pub fn location_search_query(api: &WeatherApi, text: &str) -> Option<QueryRequest<GeocodingResponse>> {
    let text = text.trim();
    if text.chars().count() < MIN_SEARCH_CHARS {
        return None;
    }
    let text = text.to_string();
    let api = api.clone();
    Some(QueryRequest::new(
        keys::geocoding::search(&text, SEARCH_RESULT_COUNT),
        Category::Geocoding.policy(),
        move || {
            let api = api.clone();
            let text = text.clone();
            async move { api.search_locations(&text, SEARCH_RESULT_COUNT).await }
        },
    ))
}
