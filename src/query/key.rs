//! Structurally comparable cache keys and the per-category key factory

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::Value;

/// An ordered list of JSON values identifying one logical request
///
/// Equality and hashing use the canonical serialization, so two keys are
/// equal exactly when their serialized forms are. `serde_json` objects keep
/// their members sorted, which makes member order irrelevant.
#[derive(Debug, Clone)]
pub struct QueryKey {
    parts: Vec<Value>,
    hash: String,
}

impl QueryKey {
    pub fn new(parts: Vec<Value>) -> Self {
        let hash = Value::Array(parts.clone()).to_string();
        Self { parts, hash }
    }

    /// Start a key from its leading string segment
    pub fn root(segment: &str) -> Self {
        Self::new(vec![Value::from(segment)])
    }

    /// Extend with a string segment
    pub fn segment(self, segment: &str) -> Self {
        self.with(Value::from(segment))
    }

    /// Extend with any serializable value
    ///
    /// Values that fail to serialize (maps with non-string keys) become `null`.
    pub fn param<T: Serialize>(self, value: &T) -> Self {
        self.with(serde_json::to_value(value).unwrap_or(Value::Null))
    }

    fn with(mut self, value: Value) -> Self {
        self.parts.push(value);
        Self::new(self.parts)
    }

    pub fn parts(&self) -> &[Value] {
        &self.parts
    }

    /// The canonical serialized form
    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// Whether `prefix`'s parts equal the leading parts of this key
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        prefix.parts.len() <= self.parts.len()
            && prefix.parts.iter().zip(&self.parts).all(|(a, b)| a == b)
    }
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

/// Key factory, one module per data category
///
/// Coordinates go into keys exactly as given. `52.52` and `52.520001` are
/// different keys.
pub mod keys {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::QueryKey;
    use crate::api::{Coordinates, ForecastRequest, HistoricalRequest, Units};

    fn location(coords: Coordinates) -> serde_json::Value {
        json!({ "latitude": coords.latitude, "longitude": coords.longitude })
    }

    pub mod weather {
        use super::*;

        pub fn all() -> QueryKey {
            QueryKey::root("weather")
        }

        pub fn current(coords: Coordinates, units: &Units) -> QueryKey {
            all().segment("current").param(&location(coords)).param(units)
        }

        pub fn forecast(request: &ForecastRequest) -> QueryKey {
            all()
                .segment("forecast")
                .param(&location(request.location))
                .param(&json!({
                    "days": request.days,
                    "hourly": request.hourly,
                    "daily": request.daily,
                }))
                .param(&request.units)
        }
    }

    pub mod historical {
        use super::*;

        pub fn all() -> QueryKey {
            QueryKey::root("historical")
        }

        pub fn range(coords: Coordinates, start: NaiveDate, end: NaiveDate) -> QueryKey {
            all().segment("range").param(&json!({
                "latitude": coords.latitude,
                "longitude": coords.longitude,
                "startDate": start.format("%Y-%m-%d").to_string(),
                "endDate": end.format("%Y-%m-%d").to_string(),
            }))
        }

        pub fn request(request: &HistoricalRequest) -> QueryKey {
            range(request.location, request.start, request.end)
                .param(&request.daily)
                .param(&request.units)
        }
    }

    pub mod geocoding {
        use super::*;

        pub fn all() -> QueryKey {
            QueryKey::root("geocoding")
        }

        pub fn search(text: &str, count: u32) -> QueryKey {
            all().segment("search").param(&json!({ "name": text, "count": count }))
        }
    }

    pub mod marine {
        use super::*;

        pub fn all() -> QueryKey {
            QueryKey::root("marine")
        }

        pub fn conditions(coords: Coordinates, units: &Units) -> QueryKey {
            all().segment("conditions").param(&location(coords)).param(units)
        }
    }

    pub mod flood {
        use super::*;

        pub fn all() -> QueryKey {
            QueryKey::root("flood")
        }

        pub fn discharge(coords: Coordinates, days: u32) -> QueryKey {
            all()
                .segment("discharge")
                .param(&location(coords))
                .param(&json!({ "days": days }))
        }
    }

    pub mod air_quality {
        use super::*;

        pub fn all() -> QueryKey {
            QueryKey::root("air-quality")
        }

        pub fn current(coords: Coordinates, units: &Units) -> QueryKey {
            all().segment("current").param(&location(coords)).param(units)
        }
    }
}
