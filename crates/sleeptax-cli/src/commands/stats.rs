use clap::Args;
use sleeptax_core::CoreError;

use crate::common::{engine, load_config, print_json, selected_group, CmdResult};

#[derive(Args)]
pub struct StatsArgs {
    /// User id (defaults to the signed-in user)
    #[arg(long)]
    user: Option<String>,
    /// Week id (defaults to the selected group's active week)
    #[arg(long)]
    week: Option<String>,
}

pub fn run(args: StatsArgs) -> CmdResult {
    let config = load_config()?;
    let engine = engine(&config)?;
    let user_id = match args.user {
        Some(id) => id,
        None => config
            .session
            .user_id
            .clone()
            .ok_or(CoreError::NotAuthenticated)?,
    };
    let week_id = match args.week {
        Some(id) => id,
        None => engine.current_week(selected_group(&config)?)?.id,
    };
    print_json(&engine.user_stats(&user_id, &week_id)?)
}
