//! TOML-based application configuration.
//!
//! Stores:
//! - Game rules (streak threshold, sleep hour bounds, pledge cap, group size)
//! - The signed-in session and selected group
//! - The SQLite database file name
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::model::User;
use crate::streak::MIN_STREAK_HOURS;

/// Thresholds the engines validate against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rules {
    #[serde(default = "default_min_streak_hours")]
    pub min_streak_hours: f64,
    #[serde(default)]
    pub min_sleep_hours: f64,
    #[serde(default = "default_max_sleep_hours")]
    pub max_sleep_hours: f64,
    #[serde(default = "default_max_pledge")]
    pub max_pledge: f64,
    /// Owner plus ten friends.
    #[serde(default = "default_max_group_size")]
    pub max_group_size: u32,
}

/// The identity handed over by the identity provider after sign-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Group the CLI operates on.
    #[serde(default)]
    pub group_id: Option<String>,
}

impl SessionConfig {
    /// The signed-in profile, if any.
    pub fn user(&self) -> Option<User> {
        let id = self.user_id.as_ref()?;
        Some(User::new(
            id.clone(),
            self.email.clone().unwrap_or_default(),
            self.name.clone().unwrap_or_default(),
            self.avatar_url.clone(),
        ))
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database file name inside the data directory.
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub rules: Rules,
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_min_streak_hours() -> f64 {
    MIN_STREAK_HOURS
}
fn default_max_sleep_hours() -> f64 {
    24.0
}
fn default_max_pledge() -> f64 {
    50.0
}
fn default_max_group_size() -> u32 {
    11
}
fn default_database() -> String {
    "sleeptax.db".into()
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            min_streak_hours: default_min_streak_hours(),
            min_sleep_hours: 0.0,
            max_sleep_hours: default_max_sleep_hours(),
            max_pledge: default_max_pledge(),
            max_group_size: default_max_group_size(),
        }
    }
}

impl Rules {
    /// Reject rule sets the engines cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.into(),
            message: message.into(),
        };
        if !(self.min_sleep_hours >= 0.0 && self.min_sleep_hours <= self.max_sleep_hours) {
            return Err(invalid(
                "rules.min_sleep_hours",
                "must be between 0 and rules.max_sleep_hours",
            ));
        }
        if !(self.max_sleep_hours <= 24.0) {
            return Err(invalid("rules.max_sleep_hours", "must not exceed 24"));
        }
        if !(self.min_streak_hours >= 0.0 && self.min_streak_hours <= self.max_sleep_hours) {
            return Err(invalid(
                "rules.min_streak_hours",
                "must be between 0 and rules.max_sleep_hours",
            ));
        }
        if !(self.max_pledge >= 0.0 && self.max_pledge.is_finite()) {
            return Err(invalid("rules.max_pledge", "must be a non-negative amount"));
        }
        if self.max_group_size == 0 {
            return Err(invalid("rules.max_group_size", "must be at least 1"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            rules: Rules::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }
        key.split('.').try_fold(root, |current, part| current.get(part))
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent) = parent {
            for part in parent.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            serde_json::Value::Number(_) => {
                if let Ok(n) = value.parse::<u64>() {
                    serde_json::Value::Number(n.into())
                } else {
                    value
                        .parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(serde_json::Value::Number)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                }
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                return Err(invalid("not a scalar key".into()));
            }
            // Optional fields: empty string clears them.
            serde_json::Value::Null | serde_json::Value::String(_) if value.is_empty() => {
                serde_json::Value::Null
            }
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Default location of the config file.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Location of the SQLite database.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join(&self.database))
    }

    /// Load from the default location.
    ///
    /// # Errors
    /// See [`Config::load_from`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the defaults cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
                cfg.rules.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(load_failed(e.to_string())),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    /// See [`Config::save_to`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::get_json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, keeping its type.
    ///
    /// # Errors
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting rules are invalid. `self` is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.rules.validate()?;
        *self = updated;
        Ok(())
    }
}
