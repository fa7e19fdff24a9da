use clap::Subcommand;

use crate::common::{engine, load_config, print_json, selected_group, CmdResult};

#[derive(Subcommand)]
pub enum WeekAction {
    /// The selected group's active week
    Current,
    /// Close the active week, record the winner and open the next (owner only)
    End,
    /// All weeks of the selected group, oldest first
    History,
}

pub fn run(action: WeekAction) -> CmdResult {
    let config = load_config()?;
    let engine = engine(&config)?;
    let group_id = selected_group(&config)?;

    match action {
        WeekAction::Current => print_json(&engine.current_week(group_id)?)?,
        WeekAction::End => print_json(&engine.end_week(group_id)?)?,
        WeekAction::History => print_json(&engine.week_history(group_id)?)?,
    }
    Ok(())
}
