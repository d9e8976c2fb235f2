//! Weather data layer: a query cache over the Open-Meteo API
//!
//! [`query::QueryClient`] is the cache engine, [`hooks::Hooks`] binds each
//! data category to it, and [`extract`] turns raw responses into the
//! simplified shapes the views consume.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod hooks;
pub mod output;
pub mod query;

pub use error::{Error, Result};
