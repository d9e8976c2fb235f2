use crate::cli::args::SearchArgs;
use crate::error::{Error, Result};
use crate::output;

use super::common::{settle, Context};

/// Handle the search command
pub async fn search(ctx: &Context, args: &SearchArgs) -> Result<String> {
    let observer = ctx.hooks.use_location_search(&args.name);
    if !observer.is_enabled() {
        return Err(Error::InvalidArgument(
            "Search text must have at least two characters".to_string(),
        ));
    }
    let response = settle(&observer).await?;

    let places: Vec<_> = response.results.iter().take(args.limit).cloned().collect();
    output::format_places(&places, ctx.format)
}
