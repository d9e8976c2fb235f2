use colored::Colorize;

use super::{Comparison, History, Location, Report};
use crate::api::{Place, Units};
use crate::extract::{AirQuality, CurrentConditions, DailySummary, FloodSummary, MarineConditions, SeriesStats};

/// Safely truncate a string to n characters, appending "..." if truncated.
/// Works correctly with multi-byte UTF-8 characters.
fn truncate_str(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > max_chars {
        let truncated: String = chars.iter().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

/// Value with a unit suffix, or a dimmed dash when missing
fn value(v: Option<f64>, unit: &str) -> String {
    match v {
        Some(v) if unit.is_empty() => format!("{:.1}", v),
        Some(v) => format!("{:.1}{}", v, unit),
        None => "–".dimmed().to_string(),
    }
}

fn temperature_unit(units: &Units) -> &'static str {
    match units.temperature.as_str() {
        "fahrenheit" => "°F",
        _ => "°C",
    }
}

fn wind_unit(units: &Units) -> &'static str {
    match units.wind_speed.as_str() {
        "ms" => " m/s",
        "mph" => " mph",
        "kn" => " kn",
        _ => " km/h",
    }
}

fn precipitation_unit(units: &Units) -> &'static str {
    match units.precipitation.as_str() {
        "inch" => " in",
        _ => " mm",
    }
}

/// Compass point for a bearing in degrees
fn compass(degrees: f64) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let index = ((degrees.rem_euclid(360.0) + 22.5) / 45.0) as usize % 8;
    POINTS[index]
}

fn header(title: &str, location: &Location, width: usize) -> String {
    let mut output = String::new();
    output.push_str(&format!("{} {}\n", title.bold(), location.name.cyan()));
    output.push_str(&format!(
        "{}\n",
        format!(
            "{:.4}, {:.4}",
            location.coordinates.latitude, location.coordinates.longitude
        )
        .dimmed()
    ));
    output.push_str(&"─".repeat(width));
    output.push('\n');
    output
}

/// Format current conditions for pretty output
pub fn format_current(report: &Report<CurrentConditions>, units: &Units) -> String {
    let c = &report.data;
    let temp = temperature_unit(units);
    let mut output = header("Current weather in", &report.location, 50);

    if let Some(description) = c.description {
        let daylight = match c.is_day {
            Some(true) => " (day)",
            Some(false) => " (night)",
            None => "",
        };
        output.push_str(&format!("{}{}\n", description.bold(), daylight.dimmed()));
    }
    output.push_str(&format!(
        "{} {}  {} {}\n",
        "Temperature:".cyan(),
        value(c.temperature, temp).bold(),
        "feels like".dimmed(),
        value(c.apparent_temperature, temp)
    ));
    output.push_str(&format!("{} {}\n", "Humidity:".cyan(), value(c.humidity, "%")));
    output.push_str(&format!(
        "{} {}\n",
        "Precipitation:".cyan(),
        value(c.precipitation, precipitation_unit(units))
    ));
    output.push_str(&format!("{} {}\n", "Cloud cover:".cyan(), value(c.cloud_cover, "%")));
    output.push_str(&format!("{} {}\n", "Pressure:".cyan(), value(c.pressure, " hPa")));

    let direction = c.wind_direction.map(compass).unwrap_or("");
    output.push_str(&format!(
        "{} {} {}  {} {}\n",
        "Wind:".cyan(),
        value(c.wind_speed, wind_unit(units)),
        direction,
        "gusts".dimmed(),
        value(c.wind_gusts, wind_unit(units))
    ));
    if let Some(ref time) = c.time {
        output.push_str(&format!("{} {}\n", "Observed:".cyan(), time.dimmed()));
    }

    output
}

fn push_days(output: &mut String, days: &[DailySummary], units: &Units) {
    let temp = temperature_unit(units);
    let precip = precipitation_unit(units);

    for day in days {
        let date = day.date.as_deref().unwrap_or("?");
        let description = truncate_str(day.description.unwrap_or(""), 22);
        output.push_str(&format!(
            "{:<12} {:>9} {:>9} {:>10}  {}\n",
            date.bold(),
            value(day.temperature_min, temp),
            value(day.temperature_max, temp),
            value(day.precipitation_sum, precip),
            description.dimmed()
        ));
    }
}

/// Format a daily forecast for pretty output
pub fn format_forecast(report: &Report<Vec<DailySummary>>, units: &Units) -> String {
    if report.data.is_empty() {
        return "No forecast data returned.".to_string();
    }

    let mut output = header("Forecast for", &report.location, 70);
    output.push_str(&format!(
        "{:<12} {:>9} {:>9} {:>10}\n",
        "Date".dimmed(),
        "Min".dimmed(),
        "Max".dimmed(),
        "Precip".dimmed()
    ));
    push_days(&mut output, &report.data, units);
    output
}

fn stats_line(label: &str, stats: &SeriesStats, unit: &str) -> String {
    format!(
        "{} min {}  mean {}  max {}\n",
        label.cyan(),
        value(stats.min, unit),
        value(stats.mean, unit),
        value(stats.max, unit)
    )
}

/// Format an archive range for pretty output
pub fn format_history(report: &Report<History>, units: &Units) -> String {
    let history = &report.data;
    let mut output = header("History for", &report.location, 70);
    output.push_str(&format!("{} → {}\n\n", history.start, history.end));

    if history.days.is_empty() {
        output.push_str("No observations in this range.\n");
        return output;
    }

    push_days(&mut output, &history.days, units);
    output.push('\n');
    output.push_str(&stats_line("Mean temperature:", &history.temperature, temperature_unit(units)));
    output.push_str(&format!(
        "{} {}\n",
        "Total precipitation:".cyan(),
        value(history.precipitation.sum, precipitation_unit(units))
    ));
    output
}

/// Format a year comparison for pretty output
pub fn format_comparison(report: &Report<Comparison>) -> String {
    let c = &report.data;
    let mut output = header("Comparison for", &report.location, 60);
    output.push_str(&format!("{} {}\n\n", "Variable:".cyan(), c.comparison.variable));

    output.push_str(&stats_line(&format!("{}:", c.first_range), &c.comparison.first, ""));
    output.push_str(&stats_line(&format!("{}:", c.second_range), &c.comparison.second, ""));

    let delta = match c.comparison.mean_delta {
        Some(d) if d > 0.0 => format!("+{:.2}", d).red().to_string(),
        Some(d) if d < 0.0 => format!("{:.2}", d).blue().to_string(),
        Some(d) => format!("{:.2}", d),
        None => "–".dimmed().to_string(),
    };
    output.push_str(&format!("\n{} {}\n", "Mean change:".bold(), delta));
    output
}

/// Format marine conditions for pretty output
pub fn format_marine(report: &Report<MarineConditions>) -> String {
    let m = &report.data;
    let mut output = header("Marine conditions at", &report.location, 50);

    let wave_direction = m.wave_direction.map(compass).unwrap_or("");
    output.push_str(&format!(
        "{} {} {}  {} {}\n",
        "Waves:".cyan(),
        value(m.wave_height, " m"),
        wave_direction,
        "period".dimmed(),
        value(m.wave_period, " s")
    ));
    output.push_str(&format!("{} {}\n", "Wind waves:".cyan(), value(m.wind_wave_height, " m")));

    let swell_direction = m.swell_wave_direction.map(compass).unwrap_or("");
    output.push_str(&format!(
        "{} {} {}  {} {}\n",
        "Swell:".cyan(),
        value(m.swell_wave_height, " m"),
        swell_direction,
        "period".dimmed(),
        value(m.swell_wave_period, " s")
    ));
    output.push_str(&format!(
        "{} {}\n",
        "Sea surface:".cyan(),
        value(m.sea_surface_temperature, "°C")
    ));
    if let Some(ref time) = m.time {
        output.push_str(&format!("{} {}\n", "Time:".cyan(), time.dimmed()));
    }
    output
}

/// Format a flood summary for pretty output
pub fn format_flood(report: &Report<FloodSummary>) -> String {
    let f = &report.data;
    let mut output = header("River discharge near", &report.location, 50);

    if f.date.is_none() {
        output.push_str("No river discharge data for this location.\n");
        return output;
    }

    output.push_str(&format!(
        "{} {} {}\n",
        "Today:".cyan(),
        value(f.discharge, " m³/s").bold(),
        format!("({})", f.date.as_deref().unwrap_or("")).dimmed()
    ));
    output.push_str(&format!(
        "{} {} – {}\n",
        "Ensemble range:".cyan(),
        value(f.discharge_min, ""),
        value(f.discharge_max, " m³/s")
    ));
    output.push_str(&format!("{} {}\n", "Period mean:".cyan(), value(f.series_mean, " m³/s")));
    output.push_str(&format!(
        "{} {} {}\n",
        "Peak:".cyan(),
        value(f.series_max, " m³/s"),
        f.peak_date.as_deref().map(|d| format!("on {d}")).unwrap_or_default().dimmed()
    ));
    output
}

/// Format air quality for pretty output
pub fn format_air(report: &Report<AirQuality>) -> String {
    let a = &report.data;
    let mut output = header("Air quality in", &report.location, 50);

    let category = match a.category {
        Some(c @ ("good" | "fair")) => c.green().to_string(),
        Some(c @ "moderate") => c.yellow().to_string(),
        Some(c) => c.red().bold().to_string(),
        None => "–".dimmed().to_string(),
    };
    output.push_str(&format!(
        "{} {} [{}]\n",
        "European AQI:".cyan(),
        value(a.european_aqi, ""),
        category
    ));
    output.push_str(&format!("{} {}\n", "US AQI:".cyan(), value(a.us_aqi, "")));
    output.push_str(&format!("{} {}\n", "PM2.5:".cyan(), value(a.pm2_5, " μg/m³")));
    output.push_str(&format!("{} {}\n", "PM10:".cyan(), value(a.pm10, " μg/m³")));
    output.push_str(&format!("{} {}\n", "Ozone:".cyan(), value(a.ozone, " μg/m³")));
    output.push_str(&format!("{} {}\n", "NO₂:".cyan(), value(a.nitrogen_dioxide, " μg/m³")));
    output.push_str(&format!("{} {}\n", "UV index:".cyan(), value(a.uv_index, "")));
    output
}

/// Format geocoding matches for pretty output
pub fn format_places(places: &[Place]) -> String {
    if places.is_empty() {
        return "No places found.".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!("{}\n", "Places".bold()));
    output.push_str(&"─".repeat(70));
    output.push('\n');

    for place in places {
        output.push_str(&format!(
            "{:<40} {}\n",
            truncate_str(&place.display_name(), 40).bold(),
            format!("{:.4}, {:.4}", place.latitude, place.longitude).dimmed()
        ));
        if let Some(population) = place.population {
            output.push_str(&format!("  {} {}\n", "Population:".cyan(), population));
        }
        if let Some(ref timezone) = place.timezone {
            output.push_str(&format!("  {} {}\n", "Timezone:".cyan(), timezone));
        }
    }

    output
}
