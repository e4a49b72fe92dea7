use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::state::Paths;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerSection,
    pub display: DisplaySection,
    pub notifications: NotificationsSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// How often `run` checks the store file for edits made by other
    /// invocations.
    pub rescan_secs: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self { rescan_secs: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    /// IANA zone used to read `--at` times and to print trigger times.
    pub timezone: String,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsSection {
    pub startup_alert: bool,
    /// External notifier, e.g. "notify-send". Receives `args`, then the
    /// title and body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Default for NotificationsSection {
    fn default() -> Self {
        Self {
            startup_alert: true,
            command: None,
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

pub fn load_config(paths: &Paths) -> Result<Config> {
    let p = paths.config_path();
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(paths: &Paths, cfg: &Config) -> Result<()> {
    paths.ensure_home()?;
    let p = paths.config_path();
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Write the default config unless one exists. Returns whether a file was
/// written.
pub fn init_config(paths: &Paths) -> Result<bool> {
    if paths.config_path().exists() {
        return Ok(false);
    }
    save_config(paths, &Config::default())?;
    Ok(true)
}

pub fn render_config(cfg: &Config) -> Result<String> {
    toml::to_string_pretty(cfg).context("serialize config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&Paths::at(dir.path())).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.scheduler.rescan_secs, 30);
        assert_eq!(cfg.display.timezone, "UTC");
        assert!(cfg.notifications.startup_alert);
        assert!(cfg.notifications.command.is_none());
        assert_eq!(cfg.logging.filter, "info");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::at(dir.path());
        fs::write(
            paths.config_path(),
            "[display]\ntimezone = \"Europe/Berlin\"\n\n[notifications]\ncommand = \"notify-send\"\n",
        )
        .unwrap();

        let cfg = load_config(&paths).unwrap();
        assert_eq!(cfg.display.timezone, "Europe/Berlin");
        assert_eq!(cfg.notifications.command.as_deref(), Some("notify-send"));
        assert!(cfg.notifications.startup_alert);
        assert_eq!(cfg.scheduler.rescan_secs, 30);
    }

    #[test]
    fn init_writes_once_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::at(dir.path().join("home"));

        assert!(init_config(&paths).unwrap());
        assert!(!init_config(&paths).unwrap());
        assert_eq!(load_config(&paths).unwrap(), Config::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::at(dir.path());
        fs::write(paths.config_path(), "[scheduler]\nrescan_secs = \"soon\"\n").unwrap();
        assert!(load_config(&paths).is_err());
    }
}
