//! Configuration for the tally lab.
//!
//! Values are layered with the following precedence (lowest to highest):
//! 1. Hardcoded defaults
//! 2. TOML file (`--config` or `TALLY_CONFIG_FILE`)
//! 3. Environment variables (`TALLY_*`)
//! 4. Command-line flags
//!
//! Every layer above the TOML file is a [`ConfigOverrides`]; only the fields
//! it actually sets replace what is below it.

pub mod error;

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use tally_constants::DEFAULT_EVENT_LOG_CAPACITY;
use tally_constants::DEFAULT_PROCESSING_DELAY_MS;
use tally_constants::DEFAULT_ROSTER;
use tally_constants::MAX_ACTORS;
use tally_constants::MAX_EVENT_LOG_CAPACITY;
use tally_constants::MAX_PROCESSING_DELAY_MS;
use tally_coordination::ActorId;
use tally_coordination::Tally;
use tally_coordination::TallyBuilder;

pub use error::ConfigError;
use error::ParseTomlSnafu;
use error::ReadFileSnafu;

/// Environment variable naming the TOML config file.
pub const CONFIG_FILE_ENV: &str = "TALLY_CONFIG_FILE";
/// Environment override for the processing delay.
pub const PROCESSING_DELAY_ENV: &str = "TALLY_PROCESSING_DELAY_MS";
/// Environment override for the initial protection mode.
pub const PROTECTION_ENV: &str = "TALLY_PROTECTION";
/// Environment override for the roster (comma separated).
pub const ROSTER_ENV: &str = "TALLY_ROSTER";

/// Top-level tally configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    /// Time each critical section spends between its read and its write.
    #[serde(default = "default_processing_delay_ms")]
    pub processing_delay_ms: u64,

    /// Whether requests take the lock when the lab starts.
    #[serde(default = "default_protection_enabled")]
    pub protection_enabled: bool,

    /// Actors registered at startup, in join order.
    #[serde(default = "default_roster")]
    pub roster: Vec<String>,

    /// Number of events retained for queries.
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: u32,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: default_processing_delay_ms(),
            protection_enabled: default_protection_enabled(),
            roster: default_roster(),
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

/// A partial layer on top of [`TallyConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub processing_delay_ms: Option<u64>,
    pub protection_enabled: Option<bool>,
    pub roster: Option<Vec<String>>,
    pub event_log_capacity: Option<u32>,
}

impl ConfigOverrides {
    /// Read `TALLY_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where F: Fn(&str) -> Option<String> {
        Ok(Self {
            processing_delay_ms: parse_env(&lookup, PROCESSING_DELAY_ENV)?,
            protection_enabled: lookup(PROTECTION_ENV).map(|v| parse_bool(PROTECTION_ENV, &v)).transpose()?,
            roster: lookup(ROSTER_ENV).map(|v| parse_list(&v)),
            event_log_capacity: None,
        })
    }
}

impl TallyConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        toml::from_str(&content).context(ParseTomlSnafu { path })
    }

    /// Defaults, then the TOML file (if any), then the environment.
    ///
    /// An explicitly named file that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(|| std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from));
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::MissingFile { path });
                }
                tracing::info!(path = %path.display(), "loading configuration");
                Self::from_toml_file(&path)?
            }
            None => Self::default(),
        };
        config.apply(ConfigOverrides::from_env()?);
        Ok(config)
    }

    /// Replace every field the overrides set.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(delay) = overrides.processing_delay_ms {
            self.processing_delay_ms = delay;
        }
        if let Some(enabled) = overrides.protection_enabled {
            self.protection_enabled = enabled;
        }
        if let Some(roster) = overrides.roster {
            self.roster = roster;
        }
        if let Some(capacity) = overrides.event_log_capacity {
            self.event_log_capacity = capacity;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing_delay_ms > MAX_PROCESSING_DELAY_MS {
            return Err(ConfigError::Validation {
                message: format!("processing_delay_ms must be at most {MAX_PROCESSING_DELAY_MS}"),
            });
        }

        if self.event_log_capacity == 0 || self.event_log_capacity > MAX_EVENT_LOG_CAPACITY {
            return Err(ConfigError::Validation {
                message: format!("event_log_capacity must be in 1..={MAX_EVENT_LOG_CAPACITY}"),
            });
        }

        if self.roster.len() > MAX_ACTORS as usize {
            return Err(ConfigError::Validation {
                message: format!("roster has {} actors, at most {MAX_ACTORS} allowed", self.roster.len()),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for id in &self.roster {
            let actor = ActorId::new(id).map_err(|e| ConfigError::Validation {
                message: format!("roster entry '{id}': {e}"),
            })?;
            if !seen.insert(actor) {
                return Err(ConfigError::Validation {
                    message: format!("roster entry '{id}' appears more than once"),
                });
            }
        }

        Ok(())
    }

    /// Processing delay as a duration.
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    /// Tally builder carrying this configuration.
    pub fn tally_builder(&self) -> TallyBuilder {
        Tally::builder()
            .processing_delay(self.processing_delay())
            .protection(self.protection_enabled)
            .event_log_capacity(self.event_log_capacity)
            .roster(self.roster.iter().cloned())
    }
}

// Default value functions
fn default_processing_delay_ms() -> u64 {
    DEFAULT_PROCESSING_DELAY_MS
}

fn default_protection_enabled() -> bool {
    true
}

fn default_roster() -> Vec<String> {
    DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect()
}

fn default_event_log_capacity() -> u32 {
    DEFAULT_EVENT_LOG_CAPACITY
}

// Helper functions for parsing environment variables
fn parse_env<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    value.trim().parse().map(Some).map_err(|e: T::Err| ConfigError::InvalidEnv {
        key: key.to_string(),
        value,
        reason: e.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true/false, on/off or 1/0".to_string(),
        }),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = TallyConfig::default();
        assert_eq!(config.processing_delay_ms, 600);
        assert!(config.protection_enabled);
        assert_eq!(config.roster, vec!["Student_101", "Student_102", "Student_103"]);
        assert_eq!(config.event_log_capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TallyConfig = toml::from_str("processing_delay_ms = 50\nprotection_enabled = false\n").unwrap();
        assert_eq!(config.processing_delay_ms, 50);
        assert!(!config.protection_enabled);
        assert_eq!(config.roster, default_roster());
    }

    #[test]
    fn test_unknown_toml_key_rejected() {
        assert!(toml::from_str::<TallyConfig>("processing_delay = 50\n").is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let path = std::env::temp_dir().join(format!("tally-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "roster = [\"a\", \"b\"]").unwrap();
        drop(file);

        let config = TallyConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.roster, vec!["a", "b"]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = TallyConfig::load(Some(Path::new("/nonexistent/tally.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let overrides = ConfigOverrides::from_lookup(lookup(&[
            (PROCESSING_DELAY_ENV, "25"),
            (PROTECTION_ENV, "off"),
            (ROSTER_ENV, "x, y,,z"),
        ]))
        .unwrap();

        let mut config = TallyConfig::default();
        config.apply(overrides);
        assert_eq!(config.processing_delay_ms, 25);
        assert!(!config.protection_enabled);
        assert_eq!(config.roster, vec!["x", "y", "z"]);
        assert_eq!(config.event_log_capacity, DEFAULT_EVENT_LOG_CAPACITY);
    }

    #[test]
    fn test_env_invalid_values() {
        let err = ConfigOverrides::from_lookup(lookup(&[(PROCESSING_DELAY_ENV, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref key, .. } if key == PROCESSING_DELAY_ENV));

        let err = ConfigOverrides::from_lookup(lookup(&[(PROTECTION_ENV, "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_later_layer_wins() {
        let mut config = TallyConfig {
            protection_enabled: false,
            ..TallyConfig::default()
        };
        config.apply(ConfigOverrides {
            protection_enabled: Some(true),
            ..ConfigOverrides::default()
        });
        assert!(config.protection_enabled);
    }

    #[test]
    fn test_validation() {
        let too_slow = TallyConfig {
            processing_delay_ms: MAX_PROCESSING_DELAY_MS + 1,
            ..TallyConfig::default()
        };
        assert!(too_slow.validate().is_err());

        let no_log = TallyConfig {
            event_log_capacity: 0,
            ..TallyConfig::default()
        };
        assert!(no_log.validate().is_err());

        let blank_actor = TallyConfig {
            roster: vec!["ok".into(), "  ".into()],
            ..TallyConfig::default()
        };
        assert!(blank_actor.validate().is_err());

        let duplicate = TallyConfig {
            roster: vec!["a".into(), "a".into()],
            ..TallyConfig::default()
        };
        assert!(duplicate.validate().is_err());
    }

    #[tokio::test]
    async fn test_builder_uses_roster() {
        let config = TallyConfig {
            roster: vec!["a".into(), "b".into()],
            ..TallyConfig::default()
        };
        let tally = config.tally_builder().build().unwrap();
        let unvoted: Vec<String> = tally.unvoted().iter().map(|a| a.to_string()).collect();
        assert_eq!(unvoted, vec!["b", "a"]);
    }
}
