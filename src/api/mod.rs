//! Open-Meteo API boundary: URL construction, GET with error
//! classification, and typed response envelopes.

mod client;
pub mod params;
pub mod types;

pub use client::{
    Endpoints, WeatherApi, AIR_QUALITY_VARIABLES, CURRENT_VARIABLES, DAILY_VARIABLES,
    DEFAULT_TIMEOUT_SECS, FLOOD_VARIABLES, FORECAST_HOURLY, MARINE_VARIABLES,
};
pub use params::{build_url, ParamValue, Params};
pub use types::*;
