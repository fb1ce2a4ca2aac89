//! TOML configuration for the `slots` binary.
//!
//! ```toml
//! name = "Alex"
//! primary = "calendars/open.ics"
//! plans = ["calendars/work.ics", "calendars/family.ics"]
//! timezone = "Europe/Berlin"
//! horizon_weeks = 3
//! topics = ["work"]
//! ```
//!
//! Relative calendar paths are resolved against the directory holding the
//! config file. Command-line flags override every field.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use slot_engine::model::parse_timezone;
use slot_engine::schedule::DEFAULT_HORIZON_WEEKS;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Shown in the header as "Schedule with <name>".
    pub name: Option<String>,
    pub primary: Option<PathBuf>,
    pub plans: Vec<PathBuf>,
    /// IANA zone of the viewer.
    pub timezone: Option<String>,
    pub horizon_weeks: Option<u32>,
    pub topics: Vec<String>,
}

/// Get the default config file path (~/.config/open-slots/config.toml)
pub fn default_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("open-slots");
    Ok(dir.join("config.toml"))
}

impl Config {
    /// Load `path`, or the default location when `path` is `None`.
    ///
    /// An explicit path must exist; a missing default file yields an empty config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_path()?;
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    debug!(path = %path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.relative_to(base))
    }

    fn relative_to(mut self, base: &Path) -> Self {
        self.primary = self.primary.map(|p| base.join(p));
        self.plans = self.plans.into_iter().map(|p| base.join(p)).collect();
        self
    }

    /// Fields set in `overrides` replace the loaded values; list fields are
    /// replaced only when the override list is non-empty.
    pub fn merge(self, overrides: Config) -> Self {
        Self {
            name: overrides.name.or(self.name),
            primary: overrides.primary.or(self.primary),
            plans: if overrides.plans.is_empty() {
                self.plans
            } else {
                overrides.plans
            },
            timezone: overrides.timezone.or(self.timezone),
            horizon_weeks: overrides.horizon_weeks.or(self.horizon_weeks),
            topics: if overrides.topics.is_empty() {
                self.topics
            } else {
                overrides.topics
            },
        }
    }

    /// The configured zone, else `$TZ` when it names an IANA zone, else UTC.
    pub fn resolve_timezone(&self) -> Result<Tz> {
        if let Some(name) = &self.timezone {
            return parse_timezone(name).with_context(|| format!("Invalid timezone '{}'", name));
        }
        let from_env = std::env::var("TZ")
            .ok()
            .and_then(|name| parse_timezone(name.trim_start_matches(':')).ok());
        Ok(from_env.unwrap_or(Tz::UTC))
    }

    pub fn horizon_weeks(&self) -> u32 {
        self.horizon_weeks.unwrap_or(DEFAULT_HORIZON_WEEKS)
    }
}
