use crate::cli::args::{FloodArgs, ForecastArgs, LocationArgs};
use crate::error::Result;
use crate::extract;
use crate::output::{self, Report};

use super::common::{resolve_location, settle, Context};

/// Handle the current command
pub async fn current(ctx: &Context, args: &LocationArgs) -> Result<String> {
    let location = resolve_location(ctx, args).await?;
    let observer = ctx.hooks.use_current_weather(Some(location.coordinates), ctx.units());
    let response = settle(&observer).await?;

    let report = Report {
        location,
        data: extract::current_conditions(&response),
    };
    output::format_current(&report, ctx.units(), ctx.format)
}

/// Handle the forecast command
pub async fn forecast(ctx: &Context, args: &ForecastArgs) -> Result<String> {
    let location = resolve_location(ctx, &args.location).await?;
    let observer = ctx
        .hooks
        .use_forecast(Some(location.coordinates), args.days, ctx.units());
    let response = settle(&observer).await?;

    let report = Report {
        location,
        data: extract::daily_summaries(&response),
    };
    output::format_forecast(&report, ctx.units(), ctx.format)
}

/// Handle the marine command
pub async fn marine(ctx: &Context, args: &LocationArgs) -> Result<String> {
    let location = resolve_location(ctx, args).await?;
    let observer = ctx.hooks.use_marine(Some(location.coordinates), ctx.units());
    let response = settle(&observer).await?;

    let report = Report {
        location,
        data: extract::marine_conditions(&response),
    };
    output::format_marine(&report, ctx.format)
}

/// Handle the flood command
pub async fn flood(ctx: &Context, args: &FloodArgs) -> Result<String> {
    let location = resolve_location(ctx, &args.location).await?;
    let observer = ctx.hooks.use_flood(Some(location.coordinates), args.days);
    let response = settle(&observer).await?;

    let report = Report {
        location,
        data: extract::flood_summary(&response),
    };
    output::format_flood(&report, ctx.format)
}

/// Handle the air command
pub async fn air(ctx: &Context, args: &LocationArgs) -> Result<String> {
    let location = resolve_location(ctx, args).await?;
    let observer = ctx.hooks.use_air_quality(Some(location.coordinates), ctx.units());
    let response = settle(&observer).await?;

    let report = Report {
        location,
        data: extract::air_quality(&response),
    };
    output::format_air(&report, ctx.format)
}
