use std::io;

use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

use crate::hooks::{DEFAULT_FLOOD_DAYS, MAX_FORECAST_DAYS};

/// Current, forecast and historical weather from Open-Meteo
#[derive(Parser)]
#[command(name = "skycast")]
#[command(version, propagate_version = true)]
#[command(about = "Current, forecast and historical weather from Open-Meteo")]
pub struct Cli {
    /// Output format (defaults to output.format from the config file)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Write shell completions to stdout
    pub fn print_completions(shell: Shell) {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
    }

    /// Log filter for the verbosity flags
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Colored, human-readable output
    #[default]
    Pretty,
    /// JSON output for scripting
    Json,
}

impl OutputFormat {
    /// Parse the config file's `output.format`, falling back to pretty
    pub fn from_config(value: &str) -> Self {
        match value {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Current conditions
    #[command(alias = "now")]
    Current(LocationArgs),

    /// Daily forecast
    #[command(alias = "f")]
    Forecast(ForecastArgs),

    /// Daily observations for a past date range
    #[command(alias = "hist")]
    History(HistoryArgs),

    /// Compare a date range against the same range in another year
    Compare(CompareArgs),

    /// Wave and swell conditions
    Marine(LocationArgs),

    /// River discharge forecast
    Flood(FloodArgs),

    /// Air quality
    #[command(alias = "aqi")]
    Air(LocationArgs),

    /// Search places by name
    #[command(alias = "s")]
    Search(SearchArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where to get weather for
///
/// Coordinates win over `--place`; with neither, the configured default
/// location is used.
#[derive(Args, Debug, Clone, Default)]
pub struct LocationArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lon: Option<f64>,

    /// Place name, resolved to its best geocoding match
    #[arg(short, long, conflicts_with_all = ["lat", "lon"])]
    pub place: Option<String>,
}

/// Arguments for the forecast command
#[derive(Args)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Number of days
    #[arg(short, long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=MAX_FORECAST_DAYS as i64))]
    pub days: u32,
}

/// Arguments for the history command
#[derive(Args)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,
}

/// Arguments for the compare command
#[derive(Args)]
pub struct CompareArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// First day of the base range (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day of the base range (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Year to compare the base range against
    #[arg(long)]
    pub year: i32,

    /// Daily variable to compare
    #[arg(long, default_value = "temperature_2m_mean")]
    pub variable: String,
}

/// Arguments for the flood command
#[derive(Args)]
pub struct FloodArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Number of forecast days
    #[arg(short, long, default_value_t = DEFAULT_FLOOD_DAYS)]
    pub days: u32,
}

/// Arguments for the search command
#[derive(Args)]
pub struct SearchArgs {
    /// Place name (at least two characters)
    pub name: String,

    /// Maximum number of results to show
    #[arg(short, long, default_value = "10")]
    pub limit: usize,
}

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., units.temperature)
        key: String,
        /// Value to set
        value: String,
    },
    /// Show configuration file path
    Path,
}

/// Arguments for the completions command
#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
