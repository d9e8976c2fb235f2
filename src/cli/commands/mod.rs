mod common;
mod config;
mod history;
mod search;
mod weather;

pub use self::common::{resolve_location, settle, Context};
pub use self::config::config;
pub use self::history::{compare, history};
pub use self::search::search;
pub use self::weather::{air, current, flood, forecast, marine};
