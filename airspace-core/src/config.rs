//! Configuration file management for airspace.
//!
//! Reads/writes `~/.airspace/config.yaml` with the map credential and style,
//! traffic polling settings, data file paths, and the dashboard address.

use std::path::{Path, PathBuf};

use crate::types::AirspaceError;

/// Environment variable holding the Mapbox access token.
pub const TOKEN_ENV: &str = "MAPBOX_TOKEN";

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub map: MapConfig,
    pub traffic: TrafficConfig,
    pub data: DataConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub token: Option<String>,
    /// Overrides every page's style when set.
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficConfig {
    pub api_url: String,
    pub poll_interval_secs: u64,
}

/// Optional data files. Built-in or bundled data is used when unset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataConfig {
    pub stations: Option<String>,
    pub routes: Option<String>,
    pub airports: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            map: MapConfig {
                token: None,
                style: None,
            },
            traffic: TrafficConfig {
                api_url: crate::opensky::STATES_URL.into(),
                poll_interval_secs: crate::traffic::POLL_INTERVAL.as_secs(),
            },
            data: DataConfig::default(),
            dashboard: DashboardConfig {
                host: "127.0.0.1".into(),
                port: 8080,
            },
        }
    }
}

/// Get the config directory path (`~/.airspace/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".airspace")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.airspace/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    load_config_from(&config_file())
}

/// Load config from an explicit path. Unreadable files fall back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable config, using defaults");
            Config::default()
        }
    }
}

/// Save config to `~/.airspace/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, AirspaceError> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), AirspaceError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| AirspaceError::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config)).map_err(|e| AirspaceError::Config(e.to_string()))
}

/// Token from the environment, else from the file. Empty strings count as
/// unset.
pub fn resolve_token(config: &Config) -> Option<String> {
    let env = std::env::var(TOKEN_ENV).ok();
    pick_token(env.as_deref(), config.map.token.as_deref())
}

fn pick_token(env: Option<&str>, file: Option<&str>) -> Option<String> {
    env.map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| file.map(str::trim).filter(|t| !t.is_empty()))
        .map(str::to_string)
}

/// Parse simple YAML-like config text. Unknown keys are ignored.
fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        let Some(section) = current_section.as_deref() else {
            continue;
        };
        match (section, key) {
            ("map", "token") => config.map.token = parse_string_value(val),
            ("map", "style") => config.map.style = parse_string_value(val),
            ("traffic", "api_url") => {
                if let Some(v) = parse_string_value(val) {
                    config.traffic.api_url = v;
                }
            }
            ("traffic", "poll_interval_secs") => {
                if let Some(v) = val.parse::<u64>().ok().filter(|v| *v > 0) {
                    config.traffic.poll_interval_secs = v;
                }
            }
            ("data", "stations") => config.data.stations = parse_string_value(val),
            ("data", "routes") => config.data.routes = parse_string_value(val),
            ("data", "airports") => config.data.airports = parse_string_value(val),
            ("dashboard", "host") => {
                if let Some(v) = parse_string_value(val) {
                    config.dashboard.host = v;
                }
            }
            ("dashboard", "port") => {
                if let Ok(v) = val.parse::<u16>() {
                    config.dashboard.port = v;
                }
            }
            _ => {}
        }
    }

    config
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn optional_line(key: &str, value: &Option<String>) -> String {
    match value {
        Some(v) => format!("  {key}: \"{v}\""),
        None => format!("  {key}: null"),
    }
}

/// Serialize config to YAML-like text.
fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# airspace configuration".to_string(), String::new()];

    lines.push("map:".into());
    lines.push(optional_line("token", &config.map.token));
    lines.push(optional_line("style", &config.map.style));
    lines.push(String::new());

    lines.push("traffic:".into());
    lines.push(format!("  api_url: \"{}\"", config.traffic.api_url));
    lines.push(format!("  poll_interval_secs: {}", config.traffic.poll_interval_secs));
    lines.push(String::new());

    lines.push("data:".into());
    lines.push(optional_line("stations", &config.data.stations));
    lines.push(optional_line("routes", &config.data.routes));
    lines.push(optional_line("airports", &config.data.airports));
    lines.push(String::new());

    lines.push("dashboard:".into());
    lines.push(format!("  host: \"{}\"", config.dashboard.host));
    lines.push(format!("  port: {}", config.dashboard.port));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
