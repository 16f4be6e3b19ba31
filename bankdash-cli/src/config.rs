use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bankdash_api::DEFAULT_BASE_URL;
use bankdash_core::RECENT_LIMIT;

use crate::state::ensure_bankdash_home;

pub const API_URL_ENV: &str = "BANKDASH_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiSection,
    pub dashboard: DashboardSection,
    pub history: HistorySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSection {
    /// Entries in the recent-activity feed.
    pub recent_limit: usize,
    /// Seconds a succeeded form stays open before closing itself.
    pub success_close_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    pub per_page: usize,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            recent_limit: RECENT_LIMIT,
            success_close_secs: 2,
        }
    }
}

impl Default for HistorySection {
    fn default() -> Self {
        Self { per_page: 20 }
    }
}

impl Config {
    pub fn success_close_delay(&self) -> Duration {
        Duration::from_secs(self.dashboard.success_close_secs)
    }

    /// A non-blank override replaces `api.base_url`.
    pub fn with_api_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        self
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_bankdash_home()?.join("config.toml"))
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

/// Config file merged with the `BANKDASH_API_URL` override.
pub fn load_config() -> Result<Config> {
    let cfg = load_config_from(&config_path()?)?;
    Ok(cfg.with_api_override(std::env::var(API_URL_ENV).ok()))
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let cfg = load_config()?;
    let s = toml::to_string_pretty(&cfg).context("serialize config")?;
    println!("# {}", config_path()?.display());
    print!("{s}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.api.base_url, "http://localhost:8080/api");
        assert_eq!(cfg.dashboard.recent_limit, 5);
        assert_eq!(cfg.success_close_delay(), Duration::from_secs(2));
        assert_eq!(cfg.history.per_page, 20);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = parse_config("[api]\nbase_url = \"https://bank.example/api\"\n").unwrap();
        assert_eq!(cfg.api.base_url, "https://bank.example/api");
        assert_eq!(cfg.dashboard.recent_limit, 5);

        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_env_override() {
        let cfg = Config::default().with_api_override(Some(" http://10.0.0.2:9000/api ".into()));
        assert_eq!(cfg.api.base_url, "http://10.0.0.2:9000/api");

        let cfg = Config::default().with_api_override(Some("   ".into()));
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
        let cfg = Config::default().with_api_override(None);
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut cfg = Config::default();
        cfg.history.per_page = 50;
        let s = toml::to_string_pretty(&cfg).unwrap();
        assert!(s.contains("[dashboard]"));
        assert_eq!(parse_config(&s).unwrap(), cfg);
    }

    #[test]
    fn test_missing_file_is_default() {
        let cfg = load_config_from(Path::new("/nonexistent/bankdash/config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(parse_config("[api\nbase_url=").is_err());
    }
}
