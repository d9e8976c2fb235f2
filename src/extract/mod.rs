//! Simplified views over raw responses
//!
//! Every extractor is total: missing blocks, short columns and nulls come
//! back as `None` fields, never as zero and never as a panic.

mod stats;

pub use stats::{compare_years, series_stats, SeriesStats, YearComparison};

use serde::Serialize;

use crate::api::{CurrentBlock, TimeSeries, WeatherResponse};

// ─────────────────────────────────────────────────────────────────────────────
// Current Conditions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub time: Option<String>,
    pub temperature: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation: Option<f64>,
    pub weather_code: Option<u8>,
    pub description: Option<&'static str>,
    pub cloud_cover: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_gusts: Option<f64>,
    pub is_day: Option<bool>,
}

pub fn current_conditions(response: &WeatherResponse) -> CurrentConditions {
    let Some(current) = &response.current else {
        return CurrentConditions::default();
    };
    let weather_code = current.value("weather_code").and_then(wmo_code);

    CurrentConditions {
        time: current.time.clone(),
        temperature: current.value("temperature_2m"),
        apparent_temperature: current.value("apparent_temperature"),
        humidity: current.value("relative_humidity_2m"),
        precipitation: current.value("precipitation"),
        weather_code,
        description: weather_code.map(weather_description),
        cloud_cover: current.value("cloud_cover"),
        pressure: current.value("pressure_msl"),
        wind_speed: current.value("wind_speed_10m"),
        wind_direction: current.value("wind_direction_10m"),
        wind_gusts: current.value("wind_gusts_10m"),
        is_day: current.value("is_day").map(|v| v >= 0.5),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Daily Summary
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: Option<String>,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub temperature_mean: Option<f64>,
    pub precipitation_sum: Option<f64>,
    pub precipitation_hours: Option<f64>,
    pub wind_speed_max: Option<f64>,
    pub wind_gusts_max: Option<f64>,
    pub weather_code: Option<u8>,
    pub description: Option<&'static str>,
}

/// Row `day` of the daily block
pub fn daily_summary(response: &WeatherResponse, day: usize) -> DailySummary {
    let Some(daily) = &response.daily else {
        return DailySummary::default();
    };
    let weather_code = daily.value("weather_code", day).and_then(wmo_code);

    DailySummary {
        date: daily.time.get(day).cloned(),
        temperature_max: daily.value("temperature_2m_max", day),
        temperature_min: daily.value("temperature_2m_min", day),
        temperature_mean: daily.value("temperature_2m_mean", day),
        precipitation_sum: daily.value("precipitation_sum", day),
        precipitation_hours: daily.value("precipitation_hours", day),
        wind_speed_max: daily.value("wind_speed_10m_max", day),
        wind_gusts_max: daily.value("wind_gusts_10m_max", day),
        weather_code,
        description: weather_code.map(weather_description),
    }
}

/// One summary per row of the daily block
pub fn daily_summaries(response: &WeatherResponse) -> Vec<DailySummary> {
    let days = response.daily.as_ref().map_or(0, TimeSeries::len);
    (0..days).map(|day| daily_summary(response, day)).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Marine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarineConditions {
    pub time: Option<String>,
    pub wave_height: Option<f64>,
    pub wave_direction: Option<f64>,
    pub wave_period: Option<f64>,
    pub wind_wave_height: Option<f64>,
    pub swell_wave_height: Option<f64>,
    pub swell_wave_direction: Option<f64>,
    pub swell_wave_period: Option<f64>,
    pub sea_surface_temperature: Option<f64>,
}

/// From the current block, or the first hourly row when there is none
pub fn marine_conditions(response: &WeatherResponse) -> MarineConditions {
    match (&response.current, &response.hourly) {
        (Some(current), _) => marine_from(current.time.clone(), |v| current.value(v)),
        (None, Some(hourly)) => marine_from(hourly.time.first().cloned(), |v| hourly.value(v, 0)),
        (None, None) => MarineConditions::default(),
    }
}

fn marine_from(time: Option<String>, value: impl Fn(&str) -> Option<f64>) -> MarineConditions {
    MarineConditions {
        time,
        wave_height: value("wave_height"),
        wave_direction: value("wave_direction"),
        wave_period: value("wave_period"),
        wind_wave_height: value("wind_wave_height"),
        swell_wave_height: value("swell_wave_height"),
        swell_wave_direction: value("swell_wave_direction"),
        swell_wave_period: value("swell_wave_period"),
        sea_surface_temperature: value("sea_surface_temperature"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Flood
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FloodSummary {
    pub date: Option<String>,
    /// Discharge of the first day, m³/s
    pub discharge: Option<f64>,
    pub discharge_max: Option<f64>,
    pub discharge_min: Option<f64>,
    /// Highest discharge over the whole series
    pub series_max: Option<f64>,
    pub series_mean: Option<f64>,
    pub peak_date: Option<String>,
}

pub fn flood_summary(response: &WeatherResponse) -> FloodSummary {
    let Some(daily) = &response.daily else {
        return FloodSummary::default();
    };
    let series = daily.column("river_discharge").unwrap_or_default();
    let stats = series_stats(series);
    let peak_date = stats.max.and_then(|max| {
        series
            .iter()
            .position(|v| *v == Some(max))
            .and_then(|i| daily.time.get(i).cloned())
    });

    FloodSummary {
        date: daily.time.first().cloned(),
        discharge: daily.value("river_discharge", 0),
        discharge_max: daily.value("river_discharge_max", 0),
        discharge_min: daily.value("river_discharge_min", 0),
        series_max: stats.max,
        series_mean: stats.mean,
        peak_date,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Air Quality
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AirQuality {
    pub time: Option<String>,
    pub european_aqi: Option<f64>,
    pub us_aqi: Option<f64>,
    pub category: Option<&'static str>,
    pub pm10: Option<f64>,
    pub pm2_5: Option<f64>,
    pub carbon_monoxide: Option<f64>,
    pub nitrogen_dioxide: Option<f64>,
    pub sulphur_dioxide: Option<f64>,
    pub ozone: Option<f64>,
    pub uv_index: Option<f64>,
}

pub fn air_quality(response: &WeatherResponse) -> AirQuality {
    let empty = CurrentBlock::default();
    let current = response.current.as_ref().unwrap_or(&empty);
    let european_aqi = current.value("european_aqi");

    AirQuality {
        time: current.time.clone(),
        european_aqi,
        us_aqi: current.value("us_aqi"),
        category: european_aqi.map(aqi_category),
        pm10: current.value("pm10"),
        pm2_5: current.value("pm2_5"),
        carbon_monoxide: current.value("carbon_monoxide"),
        nitrogen_dioxide: current.value("nitrogen_dioxide"),
        sulphur_dioxide: current.value("sulphur_dioxide"),
        ozone: current.value("ozone"),
        uv_index: current.value("uv_index"),
    }
}

/// European AQI band
pub fn aqi_category(index: f64) -> &'static str {
    match index {
        i if i <= 20.0 => "good",
        i if i <= 40.0 => "fair",
        i if i <= 60.0 => "moderate",
        i if i <= 80.0 => "poor",
        i if i <= 100.0 => "very poor",
        _ => "extremely poor",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Weather Codes
// ─────────────────────────────────────────────────────────────────────────────

fn wmo_code(value: f64) -> Option<u8> {
    (0.0..=99.0)
        .contains(&value)
        .then_some(value)
        .filter(|v| v.fract() == 0.0)
        .map(|v| v as u8)
}

/// WMO weather interpretation code
pub fn weather_description(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 | 67 => "Freezing rain",
        71 => "Slight snow",
        73 => "Moderate snow",
        75 => "Heavy snow",
        77 => "Snow grains",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}
