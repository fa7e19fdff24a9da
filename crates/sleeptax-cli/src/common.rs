//! Helpers shared by the subcommands.

use std::sync::Arc;

use serde::Serialize;
use sleeptax_core::{Config, CoreError, SessionIdentity, SleepTax, SqliteStore};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config() -> Result<Config, CoreError> {
    Ok(Config::load()?)
}

/// Engine over the configured SQLite database, acting as the session user.
pub fn engine(config: &Config) -> Result<SleepTax, CoreError> {
    let store = SqliteStore::open(&config.database_path()?)?;
    Ok(
        SleepTax::new(Arc::new(store), SessionIdentity::from(&config.session))
            .with_rules(config.rules.clone()),
    )
}

/// The group selected by `group create` / `group join`.
pub fn selected_group(config: &Config) -> Result<&str, CoreError> {
    config
        .session
        .group_id
        .as_deref()
        .ok_or_else(|| CoreError::NotFound {
            kind: "group",
            id: "none selected (run `sleeptax group join <code>`)".into(),
        })
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
