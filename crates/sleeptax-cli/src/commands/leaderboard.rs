use clap::Args;

use crate::common::{engine, load_config, print_json, selected_group, CmdResult};

#[derive(Args)]
pub struct LeaderboardArgs {
    /// Week id (defaults to the selected group's active week)
    #[arg(long)]
    week: Option<String>,
}

pub fn run(args: LeaderboardArgs) -> CmdResult {
    let config = load_config()?;
    let engine = engine(&config)?;
    let week_id = match args.week {
        Some(id) => id,
        None => engine.current_week(selected_group(&config)?)?.id,
    };
    print_json(&engine.get_leaderboard(&week_id)?)
}
