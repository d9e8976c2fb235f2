use serde::Serialize;

use crate::api::WeatherResponse;

/// Summary statistics over a numeric series
///
/// Nulls and non-finite values are skipped. Every field except `count` is
/// `None` when nothing remains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub sum: Option<f64>,
}

pub fn series_stats(values: &[Option<f64>]) -> SeriesStats {
    let mut stats = SeriesStats::default();
    for value in values.iter().flatten().copied().filter(|v| v.is_finite()) {
        stats.count += 1;
        stats.min = Some(stats.min.map_or(value, |m| m.min(value)));
        stats.max = Some(stats.max.map_or(value, |m| m.max(value)));
        stats.sum = Some(stats.sum.unwrap_or(0.0) + value);
    }
    stats.mean = stats.sum.map(|sum| sum / stats.count as f64);
    stats
}

/// One daily variable compared across two archive responses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearComparison {
    pub variable: String,
    pub first: SeriesStats,
    pub second: SeriesStats,
    /// `second.mean - first.mean`
    pub mean_delta: Option<f64>,
}

/// Compare a daily variable between two responses, typically the same date
/// range in two different years
pub fn compare_years(first: &WeatherResponse, second: &WeatherResponse, variable: &str) -> YearComparison {
    let stats = |response: &WeatherResponse| {
        response
            .daily
            .as_ref()
            .and_then(|daily| daily.column(variable))
            .map(series_stats)
            .unwrap_or_default()
    };
    let first = stats(first);
    let second = stats(second);
    let mean_delta = first.mean.zip(second.mean).map(|(a, b)| b - a);

    YearComparison {
        variable: variable.to_string(),
        first,
        second,
        mean_delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TimeSeries;

    fn archive(values: Vec<Option<f64>>) -> WeatherResponse {
        let mut daily = TimeSeries::default();
        daily.time = (1..=values.len()).map(|d| format!("2024-01-{d:02}")).collect();
        daily.columns.insert("temperature_2m_mean".to_string(), values);
        WeatherResponse {
            daily: Some(daily),
            ..Default::default()
        }
    }

    #[test]
    fn test_series_stats() {
        let stats = series_stats(&[Some(1.0), None, Some(4.0), Some(-2.0), Some(f64::NAN)]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, Some(-2.0));
        assert_eq!(stats.max, Some(4.0));
        assert_eq!(stats.sum, Some(3.0));
        assert_eq!(stats.mean, Some(1.0));
    }

    #[test]
    fn test_series_stats_empty() {
        assert_eq!(series_stats(&[]), SeriesStats::default());
        let nulls = series_stats(&[None, None]);
        assert_eq!(nulls.count, 0);
        assert_eq!(nulls.mean, None);
    }

    #[test]
    fn test_compare_years() {
        let cold = archive(vec![Some(-1.0), Some(1.0)]);
        let warm = archive(vec![Some(2.0), Some(4.0)]);
        let cmp = compare_years(&cold, &warm, "temperature_2m_mean");

        assert_eq!(cmp.first.mean, Some(0.0));
        assert_eq!(cmp.second.mean, Some(3.0));
        assert_eq!(cmp.mean_delta, Some(3.0));
    }

    #[test]
    fn test_compare_years_missing_data() {
        let cmp = compare_years(&archive(vec![Some(1.0)]), &WeatherResponse::default(), "temperature_2m_mean");
        assert_eq!(cmp.first.count, 1);
        assert_eq!(cmp.second.count, 0);
        assert_eq!(cmp.mean_delta, None);
    }
}
