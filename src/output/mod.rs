pub mod json;
pub mod pretty;

use serde::Serialize;

use crate::api::{Coordinates, Place, Units};
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::extract::{
    AirQuality, CurrentConditions, DailySummary, FloodSummary, MarineConditions, SeriesStats,
    YearComparison,
};

/// A resolved location and its display label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
}

impl Location {
    pub fn new(name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }
}

/// Extracted data for one location
#[derive(Debug, Clone, Serialize)]
pub struct Report<T> {
    pub location: Location,
    pub data: T,
}

/// Daily rows of an archive range with aggregates
#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub start: String,
    pub end: String,
    pub days: Vec<DailySummary>,
    pub temperature: SeriesStats,
    pub precipitation: SeriesStats,
}

/// One range compared against the same range in another year
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub first_range: String,
    pub second_range: String,
    #[serde(flatten)]
    pub comparison: YearComparison,
}

/// Format current conditions based on output format
pub fn format_current(report: &Report<CurrentConditions>, units: &Units, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_current(report, units)),
        OutputFormat::Json => json::format_json(report),
    }
}

/// Format a daily forecast based on output format
pub fn format_forecast(report: &Report<Vec<DailySummary>>, units: &Units, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_forecast(report, units)),
        OutputFormat::Json => json::format_json(report),
    }
}

/// Format an archive range based on output format
pub fn format_history(report: &Report<History>, units: &Units, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_history(report, units)),
        OutputFormat::Json => json::format_json(report),
    }
}

/// Format a year comparison based on output format
pub fn format_comparison(report: &Report<Comparison>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_comparison(report)),
        OutputFormat::Json => json::format_json(report),
    }
}

/// Format marine conditions based on output format
pub fn format_marine(report: &Report<MarineConditions>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_marine(report)),
        OutputFormat::Json => json::format_json(report),
    }
}

/// Format a flood summary based on output format
pub fn format_flood(report: &Report<FloodSummary>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_flood(report)),
        OutputFormat::Json => json::format_json(report),
    }
}

/// Format air quality based on output format
pub fn format_air(report: &Report<AirQuality>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_air(report)),
        OutputFormat::Json => json::format_json(report),
    }
}

/// Format geocoding matches based on output format
pub fn format_places(places: &[Place], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_places(places)),
        OutputFormat::Json => json::format_json(places),
    }
}
