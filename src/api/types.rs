use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite, in range, and not the `(0, 0)` "no location" sentinel
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && !(self.latitude == 0.0 && self.longitude == 0.0)
    }
}

/// Unit and timezone selection shared by the weather endpoints
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Units {
    pub temperature: String,
    pub wind_speed: String,
    pub precipitation: String,
    pub timezone: String,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            temperature: "celsius".to_string(),
            wind_speed: "kmh".to_string(),
            precipitation: "mm".to_string(),
            timezone: "auto".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Weather responses
// ─────────────────────────────────────────────────────────────────────────────

/// Response envelope shared by the forecast, archive, marine, air quality
/// and flood endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub timezone_abbreviation: Option<String>,
    #[serde(default)]
    pub utc_offset_seconds: Option<i64>,
    #[serde(default)]
    pub generationtime_ms: Option<f64>,
    #[serde(default)]
    pub current: Option<CurrentBlock>,
    #[serde(default)]
    pub current_units: Option<HashMap<String, String>>,
    #[serde(default)]
    pub hourly: Option<TimeSeries>,
    #[serde(default)]
    pub hourly_units: Option<HashMap<String, String>>,
    #[serde(default)]
    pub daily: Option<TimeSeries>,
    #[serde(default)]
    pub daily_units: Option<HashMap<String, String>>,
}

impl WeatherResponse {
    /// Unit label for a current/hourly/daily variable
    pub fn unit(&self, variable: &str) -> Option<&str> {
        [&self.current_units, &self.hourly_units, &self.daily_units]
            .into_iter()
            .flatten()
            .find_map(|units| units.get(variable))
            .map(String::as_str)
    }
}

/// The `current` block: one timestamp and a sparse set of scalar values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentBlock {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl CurrentBlock {
    pub fn value(&self, variable: &str) -> Option<f64> {
        self.values.get(variable).copied().flatten().filter(|v| v.is_finite())
    }
}

/// Time-aligned parallel arrays keyed by variable name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(flatten)]
    pub columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl TimeSeries {
    pub fn column(&self, variable: &str) -> Option<&[Option<f64>]> {
        self.columns.get(variable).map(Vec::as_slice)
    }

    /// Value of `variable` at row `index`; `None` for missing columns,
    /// short columns and nulls
    pub fn value(&self, variable: &str, index: usize) -> Option<f64> {
        self.column(variable)?
            .get(index)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Geocoding responses
// ─────────────────────────────────────────────────────────────────────────────

/// Response from the geocoding search endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodingResponse {
    /// Absent when nothing matched
    #[serde(default)]
    pub results: Vec<Place>,
    #[serde(default)]
    pub generationtime_ms: Option<f64>,
}

/// A geocoding match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
}

impl Place {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// "Berlin, Land Berlin, Germany"
    pub fn display_name(&self) -> String {
        [Some(self.name.as_str()), self.admin1.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters identifying a forecast request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRequest {
    pub location: Coordinates,
    pub days: u32,
    pub hourly: Vec<String>,
    pub daily: Vec<String>,
    pub units: Units,
}

/// Parameters identifying an archive request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRequest {
    pub location: Coordinates,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub daily: Vec<String>,
    pub units: Units,
}

impl HistoricalRequest {
    pub fn is_valid_range(&self) -> bool {
        self.start <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validity() {
        assert!(Coordinates::new(52.52, 13.41).is_valid());
        assert!(Coordinates::new(-90.0, 180.0).is_valid());
        assert!(Coordinates::new(0.0, 13.41).is_valid());
        assert!(!Coordinates::new(0.0, 0.0).is_valid());
        assert!(!Coordinates::new(91.0, 0.5).is_valid());
        assert!(!Coordinates::new(10.0, -180.5).is_valid());
        assert!(!Coordinates::new(f64::NAN, 1.0).is_valid());
    }

    #[test]
    fn test_weather_response_parses_sparse_envelope() {
        let body = r#"{
            "latitude": 52.52,
            "longitude": 13.419998,
            "timezone": "Europe/Berlin",
            "current": {"time": "2024-06-01T12:00", "interval": 900, "temperature_2m": 21.4, "rain": null},
            "current_units": {"temperature_2m": "°C"},
            "daily": {"time": ["2024-06-01", "2024-06-02"], "temperature_2m_max": [24.1, null]}
        }"#;

        let response: WeatherResponse = serde_json::from_str(body).unwrap();
        let current = response.current.as_ref().unwrap();
        assert_eq!(current.value("temperature_2m"), Some(21.4));
        assert_eq!(current.value("rain"), None);
        assert_eq!(current.value("snowfall"), None);

        let daily = response.daily.as_ref().unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily.value("temperature_2m_max", 0), Some(24.1));
        assert_eq!(daily.value("temperature_2m_max", 1), None);
        assert_eq!(daily.value("temperature_2m_max", 5), None);
        assert!(response.hourly.is_none());
        assert_eq!(response.unit("temperature_2m"), Some("°C"));
    }

    #[test]
    fn test_geocoding_without_results() {
        let response: GeocodingResponse =
            serde_json::from_str(r#"{"generationtime_ms": 0.5}"#).unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_place_display_name() {
        let place: Place = serde_json::from_str(
            r#"{"id": 2950159, "name": "Berlin", "latitude": 52.52437, "longitude": 13.41053,
                "country": "Germany", "admin1": "Land Berlin"}"#,
        )
        .unwrap();
        assert_eq!(place.display_name(), "Berlin, Land Berlin, Germany");
        assert_eq!(place.coordinates(), Coordinates::new(52.52437, 13.41053));
    }
}
