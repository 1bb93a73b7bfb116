#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the WashCall client.
//!
//! Every section is optional in TOML and falls back to its `Default`, so an
//! empty file is a valid configuration pointing at a local backend.
use std::path::Path;

use eyre::WrapErr;
use serde::Deserialize;
use washcall_ui::Locale;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerCfg {
    /// REST base URL, e.g. `https://server.washcall.space`
    pub base_url: String,
    /// Bearer token; `WASHCALL_TOKEN` overrides it at startup.
    pub token: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            token: None,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RealtimeCfg {
    /// Socket path appended to the base URL
    pub path: String,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay_ms: u64,
    /// Socket read timeout; bounds how long shutdown can take
    pub read_timeout_ms: u64,
}

impl Default for RealtimeCfg {
    fn default() -> Self {
        Self {
            path: "/status_update".to_string(),
            reconnect_delay_ms: 5000,
            read_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiCfg {
    pub locale: Locale,
    /// Courses offered by `start`. Empty allows any name.
    pub courses: Vec<String>,
}

impl Default for UiCfg {
    fn default() -> Self {
        Self {
            locale: Locale::Ko,
            courses: vec!["표준".to_string(), "쾌속".to_string(), "울/섬세".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Never,
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info", "debug", or a full filter directive
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationCfg {
    /// Talk to the in-memory server instead of the network
    pub enabled: bool,
    /// Switch to the simulation when the initial load cannot reach the server
    pub fallback_on_network_error: bool,
    /// Wall-clock length of one simulated minute
    pub tick_ms: u64,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            fallback_on_network_error: true,
            tick_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerCfg,
    pub realtime: RealtimeCfg,
    pub ui: UiCfg,
    pub logging: Logging,
    pub simulation: SimulationCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file. Validation is left to the caller.
pub fn load_path(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    load_toml(&text).wrap_err_with(|| format!("parsing config {}", path.display()))
}

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Server
        let base = self.server.base_url.trim();
        if base.is_empty() {
            eyre::bail!("server.base_url must not be empty");
        }
        if base.contains("://") && !(base.starts_with("http://") || base.starts_with("https://")) {
            eyre::bail!("server.base_url must use http:// or https://");
        }
        if self.server.request_timeout_ms == 0 {
            eyre::bail!("server.request_timeout_ms must be > 0");
        }
        if self.server.request_timeout_ms > 5 * 60 * 1000 {
            eyre::bail!("server.request_timeout_ms is unreasonably large (>5min)");
        }

        // Realtime
        if !self.realtime.path.starts_with('/') {
            eyre::bail!("realtime.path must start with '/'");
        }
        if self.realtime.reconnect_delay_ms < 100 {
            eyre::bail!("realtime.reconnect_delay_ms must be >= 100");
        }
        if self.realtime.reconnect_delay_ms > 10 * 60 * 1000 {
            eyre::bail!("realtime.reconnect_delay_ms is unreasonably large (>10min)");
        }
        if self.realtime.read_timeout_ms == 0 {
            eyre::bail!("realtime.read_timeout_ms must be > 0");
        }
        if self.realtime.read_timeout_ms > 60 * 1000 {
            eyre::bail!("realtime.read_timeout_ms must be <= 60000");
        }

        // UI
        for (i, course) in self.ui.courses.iter().enumerate() {
            if course.trim().is_empty() {
                eyre::bail!("ui.courses[{i}] must not be blank");
            }
            if self.ui.courses[..i].contains(course) {
                eyre::bail!("ui.courses contains duplicate course {course:?}");
            }
        }

        // Logging
        if let Some(level) = self.logging.level.as_deref()
            && !level.contains('=')
            && !LEVELS.contains(&level.trim().to_ascii_lowercase().as_str())
        {
            eyre::bail!("logging.level must be one of {LEVELS:?} or a filter directive");
        }

        // Simulation
        if self.simulation.tick_ms > 60 * 1000 {
            eyre::bail!("simulation.tick_ms must be <= 60000");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_valid_defaults() {
        let cfg = load_toml("").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.realtime.reconnect_delay_ms, 5000);
        assert_eq!(cfg.ui.locale, Locale::Ko);
        assert_eq!(cfg.ui.courses.len(), 3);
        assert!(cfg.simulation.fallback_on_network_error);
        assert_eq!(cfg.logging.rotation, Rotation::Never);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = load_toml(
            r#"
[server]
base_url = "https://server.washcall.space"

[logging]
rotation = "daily"
"#,
        )
        .unwrap();
        assert_eq!(cfg.server.request_timeout_ms, 10_000);
        assert_eq!(cfg.server.token, None);
        assert_eq!(cfg.logging.rotation, Rotation::Daily);
    }
}
