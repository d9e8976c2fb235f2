//! Helpers shared by the weather commands

use std::sync::Arc;

use crate::api::{Coordinates, Units};
use crate::cli::args::{LocationArgs, OutputFormat};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hooks::Hooks;
use crate::output::Location;
use crate::query::QueryObserver;

/// Everything a weather command needs
#[derive(Debug)]
pub struct Context {
    pub hooks: Hooks,
    pub config: Config,
    pub format: OutputFormat,
}

impl Context {
    pub fn units(&self) -> &Units {
        &self.config.units
    }
}

/// Resolve the location flags to coordinates and a display label
///
/// Precedence: `--lat/--lon`, then `--place` (first geocoding match), then
/// the configured default.
pub async fn resolve_location(ctx: &Context, args: &LocationArgs) -> Result<Location> {
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        let coordinates = checked(Coordinates::new(lat, lon))?;
        return Ok(Location::new(format!("{lat:.4}, {lon:.4}"), coordinates));
    }

    if let Some(ref place) = args.place {
        let search = ctx.hooks.use_location_search(place);
        if !search.is_enabled() {
            return Err(Error::InvalidArgument(
                "Place name must have at least two characters".to_string(),
            ));
        }
        let response = settle(&search).await?;
        let best = response.results.first().ok_or_else(|| {
            Error::InvalidArgument(format!("No place found matching '{}'", place.trim()))
        })?;
        return Ok(Location::new(best.display_name(), checked(best.coordinates())?));
    }

    let defaults = &ctx.config.defaults;
    let coordinates = checked(defaults.location().ok_or(Error::NoLocation)?)?;
    let label = defaults
        .name
        .clone()
        .unwrap_or_else(|| format!("{:.4}, {:.4}", coordinates.latitude, coordinates.longitude));
    Ok(Location::new(label, coordinates))
}

/// `(0, 0)` means no location; other invalid pairs are rejected outright
fn checked(coordinates: Coordinates) -> Result<Coordinates> {
    if coordinates.latitude == 0.0 && coordinates.longitude == 0.0 {
        return Err(Error::NoLocation);
    }
    if !coordinates.is_valid() {
        return Err(Error::InvalidArgument(format!(
            "Coordinates out of range: {}, {}",
            coordinates.latitude, coordinates.longitude
        )));
    }
    Ok(coordinates)
}

/// Wait for an observer's fetch and return its data or its error
pub async fn settle<T: Send + Sync + 'static>(observer: &QueryObserver<T>) -> Result<Arc<T>> {
    let state = observer.settled().await;
    match (state.data, state.error) {
        (Some(data), _) => Ok(data),
        (None, Some(err)) => Err(Error::Cached(err)),
        (None, None) => Err(Error::QueryDisabled),
    }
}
