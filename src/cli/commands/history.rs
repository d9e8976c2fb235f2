use chrono::{Datelike, NaiveDate};

use crate::api::WeatherResponse;
use crate::cli::args::{CompareArgs, HistoryArgs};
use crate::error::{Error, Result};
use crate::extract::{self, SeriesStats};
use crate::output::{self, Comparison, History, Report};

use super::common::{resolve_location, settle, Context};

/// Handle the history command
pub async fn history(ctx: &Context, args: &HistoryArgs) -> Result<String> {
    check_range(args.start, args.end)?;
    let location = resolve_location(ctx, &args.location).await?;
    let observer = ctx.hooks.use_historical(
        Some(location.coordinates),
        Some(args.start),
        Some(args.end),
        ctx.units(),
    );
    let response = settle(&observer).await?;

    let report = Report {
        location,
        data: History {
            start: args.start.to_string(),
            end: args.end.to_string(),
            days: extract::daily_summaries(&response),
            temperature: daily_stats(&response, "temperature_2m_mean"),
            precipitation: daily_stats(&response, "precipitation_sum"),
        },
    };
    output::format_history(&report, ctx.units(), ctx.format)
}

/// Handle the compare command
pub async fn compare(ctx: &Context, args: &CompareArgs) -> Result<String> {
    check_range(args.start, args.end)?;
    let (other_start, other_end) = shift_range(args.start, args.end, args.year)?;
    let location = resolve_location(ctx, &args.location).await?;
    let coordinates = Some(location.coordinates);

    // Both fetches are in flight before either is awaited
    let base = ctx
        .hooks
        .use_historical(coordinates, Some(args.start), Some(args.end), ctx.units());
    let other = ctx
        .hooks
        .use_historical(coordinates, Some(other_start), Some(other_end), ctx.units());
    let (first, second) = tokio::try_join!(settle(&base), settle(&other))?;

    let report = Report {
        location,
        data: Comparison {
            first_range: format!("{} – {}", args.start, args.end),
            second_range: format!("{} – {}", other_start, other_end),
            comparison: extract::compare_years(&first, &second, &args.variable),
        },
    };
    output::format_comparison(&report, ctx.format)
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(Error::InvalidArgument(format!(
            "--start ({start}) must not be after --end ({end})"
        )));
    }
    Ok(())
}

/// The same calendar range moved so it starts in `year`
fn shift_range(start: NaiveDate, end: NaiveDate, year: i32) -> Result<(NaiveDate, NaiveDate)> {
    let span = end.year() - start.year();
    let shifted = start.with_year(year).zip(end.with_year(year + span));
    shifted.ok_or_else(|| {
        Error::InvalidArgument(format!("{start} – {end} has no counterpart in {year}"))
    })
}

fn daily_stats(response: &WeatherResponse, variable: &str) -> SeriesStats {
    response
        .daily
        .as_ref()
        .and_then(|daily| daily.column(variable))
        .map(extract::series_stats)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_shift_range() {
        let (start, end) = shift_range(date(2023, 7, 1), date(2023, 7, 31), 2024).unwrap();
        assert_eq!(start, date(2024, 7, 1));
        assert_eq!(end, date(2024, 7, 31));
    }

    #[test]
    fn test_shift_range_across_new_year() {
        let (start, end) = shift_range(date(2022, 12, 20), date(2023, 1, 10), 2020).unwrap();
        assert_eq!(start, date(2020, 12, 20));
        assert_eq!(end, date(2021, 1, 10));
    }

    #[test]
    fn test_shift_leap_day_fails() {
        assert!(shift_range(date(2024, 2, 29), date(2024, 3, 5), 2023).is_err());
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let err = check_range(date(2024, 2, 1), date(2024, 1, 1)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
