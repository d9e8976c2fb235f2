use colored::Colorize;

use crate::cli::args::{ConfigArgs, ConfigCommands, OutputFormat};
use crate::config::{Config, Paths};
use crate::error::Result;

/// Handle the config command
pub fn config(config: &mut Config, paths: &Paths, args: &ConfigArgs, format: OutputFormat) -> Result<String> {
    match &args.command {
        ConfigCommands::Show => config_show(config, format),
        ConfigCommands::Set { key, value } => config_set(config, paths, key, value, format),
        ConfigCommands::Path => config_path(paths, format),
    }
}

/// Show an API key by its ends only
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}

fn or_unset(value: Option<String>) -> String {
    value.unwrap_or_else(|| "(not set)".dimmed().to_string())
}

/// Show current configuration
fn config_show(config: &Config, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => {
            let mut output = String::new();
            output.push_str(&format!("{}\n", "Configuration".bold()));
            output.push_str(&"─".repeat(40));
            output.push('\n');

            let endpoints = config.api.endpoints();
            output.push_str(&format!("\n{}\n", "[api]".cyan()));
            output.push_str(&format!("  forecast_url = {}\n", endpoints.forecast));
            output.push_str(&format!("  archive_url = {}\n", endpoints.archive));
            output.push_str(&format!("  marine_url = {}\n", endpoints.marine));
            output.push_str(&format!("  air_quality_url = {}\n", endpoints.air_quality));
            output.push_str(&format!("  flood_url = {}\n", endpoints.flood));
            output.push_str(&format!("  geocoding_url = {}\n", endpoints.geocoding));
            output.push_str(&format!(
                "  api_key = {}\n",
                or_unset(config.api.api_key.as_deref().map(mask))
            ));
            output.push_str(&format!("  timeout_secs = {}\n", config.api.timeout_secs));

            output.push_str(&format!("\n{}\n", "[units]".cyan()));
            output.push_str(&format!("  temperature = {}\n", config.units.temperature));
            output.push_str(&format!("  wind_speed = {}\n", config.units.wind_speed));
            output.push_str(&format!("  precipitation = {}\n", config.units.precipitation));
            output.push_str(&format!("  timezone = {}\n", config.units.timezone));

            output.push_str(&format!("\n{}\n", "[cache]".cyan()));
            output.push_str(&format!("  retries = {}\n", config.cache.retries));
            output.push_str(&format!("  retry_base_ms = {}\n", config.cache.retry_base_ms));
            output.push_str(&format!("  retry_max_ms = {}\n", config.cache.retry_max_ms));

            output.push_str(&format!("\n{}\n", "[defaults]".cyan()));
            output.push_str(&format!(
                "  latitude = {}\n",
                or_unset(config.defaults.latitude.map(|v| v.to_string()))
            ));
            output.push_str(&format!(
                "  longitude = {}\n",
                or_unset(config.defaults.longitude.map(|v| v.to_string()))
            ));
            output.push_str(&format!("  name = {}\n", or_unset(config.defaults.name.clone())));

            output.push_str(&format!("\n{}\n", "[output]".cyan()));
            output.push_str(&format!("  format = {}\n", config.output.format));

            Ok(output)
        }
        OutputFormat::Json => {
            let mut safe_config = config.clone();
            safe_config.api.api_key = safe_config.api.api_key.as_deref().map(mask);
            Ok(serde_json::to_string_pretty(&safe_config)?)
        }
    }
}

/// Set a configuration value
fn config_set(config: &mut Config, paths: &Paths, key: &str, value: &str, format: OutputFormat) -> Result<String> {
    config.set_value(key, value)?;
    config.save_to(paths)?;

    let shown = if key == "api.api_key" { mask(value) } else { value.to_string() };
    match format {
        OutputFormat::Pretty => Ok(format!("{} Set {} = {}", "✓".green(), key, shown)),
        OutputFormat::Json => {
            let result = serde_json::json!({
                "success": true,
                "key": key,
                "value": shown
            });
            Ok(serde_json::to_string_pretty(&result)?)
        }
    }
}

/// Show configuration file path
fn config_path(paths: &Paths, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => {
            let mut output = String::new();
            output.push_str(&format!("Config file: {}\n", paths.config_file.display()));
            output.push_str(&format!(
                "Exists: {}\n",
                if paths.config_exists() {
                    "yes".green()
                } else {
                    "no".yellow()
                }
            ));
            Ok(output)
        }
        OutputFormat::Json => {
            let result = serde_json::json!({
                "path": paths.config_file.display().to_string(),
                "exists": paths.config_exists()
            });
            Ok(serde_json::to_string_pretty(&result)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(command: ConfigCommands) -> ConfigArgs {
        ConfigArgs { command }
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("abcd1234efgh"), "abcd...efgh");
        assert_eq!(mask("short"), "****");
    }

    #[test]
    fn test_set_saves_to_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::in_dir(temp_dir.path().to_path_buf());
        let mut cfg = Config::default();

        let set = ConfigCommands::Set {
            key: "units.wind_speed".to_string(),
            value: "kn".to_string(),
        };
        config(&mut cfg, &paths, &args(set), OutputFormat::Json).unwrap();

        let loaded = Config::load_from(&paths).unwrap();
        assert_eq!(loaded.units.wind_speed, "kn");
    }

    #[test]
    fn test_invalid_set_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::in_dir(temp_dir.path().to_path_buf());
        let mut cfg = Config::default();

        let set = ConfigCommands::Set {
            key: "output.format".to_string(),
            value: "yaml".to_string(),
        };
        assert!(config(&mut cfg, &paths, &args(set), OutputFormat::Pretty).is_err());
        assert!(!paths.config_exists());
    }

    #[test]
    fn test_show_json_masks_api_key() {
        let mut cfg = Config::default();
        cfg.api.api_key = Some("supersecretkey".to_string());

        let json = config_show(&cfg, OutputFormat::Json).unwrap();
        assert!(json.contains("supe...tkey"));
        assert!(!json.contains("supersecretkey"));
    }

    #[test]
    fn test_path_json() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::in_dir(temp_dir.path().to_path_buf());
        let json = config_path(&paths, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["exists"], false);
    }
}
