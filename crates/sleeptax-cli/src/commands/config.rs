use clap::Subcommand;
use sleeptax_core::{Config, ConfigError, CoreError};

use crate::common::{load_config, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "rules.max_pledge", "session.group_id")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value (empty clears an optional session field)
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Get { key } => {
            let config = load_config()?;
            let value = config
                .get(&key)
                .ok_or_else(|| CoreError::from(ConfigError::UnknownKey(key)))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = load_config()?;
            config.set(&key, &value).map_err(CoreError::from)?;
            config.save().map_err(CoreError::from)?;
            println!("ok");
        }
        ConfigAction::List => print_json(&load_config()?)?,
        ConfigAction::Reset => {
            Config::default().save().map_err(CoreError::from)?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
