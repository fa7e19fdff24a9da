use clap::Subcommand;
use serde_json::json;
use sleeptax_core::{Config, CoreError};

use crate::common::{engine, load_config, print_json, selected_group, CmdResult};

#[derive(Subcommand)]
pub enum GroupAction {
    /// Create a group, become its owner and select it
    Create {
        /// Group name
        name: String,
    },
    /// Join a group by its code and select it
    Join {
        /// Join code (e.g. "SLEEP-2024")
        code: String,
    },
    /// Show the selected group, its members and the active week
    Show {
        /// Group id (defaults to the selected group)
        #[arg(long)]
        id: Option<String>,
    },
}

fn select(config: &mut Config, group_id: &str) -> Result<(), CoreError> {
    config.session.group_id = Some(group_id.to_string());
    Ok(config.save()?)
}

pub fn run(action: GroupAction) -> CmdResult {
    let mut config = load_config()?;
    let engine = engine(&config)?;

    match action {
        GroupAction::Create { name } => {
            let (group, week) = engine.create_group(&name)?;
            select(&mut config, &group.id)?;
            print_json(&json!({ "group": group, "week": week }))?;
        }
        GroupAction::Join { code } => {
            let group = engine.join_group(&code)?;
            select(&mut config, &group.id)?;
            print_json(&group)?;
        }
        GroupAction::Show { id } => {
            let group_id = match id {
                Some(id) => id,
                None => selected_group(&config)?.to_string(),
            };
            let group = engine.group(&group_id)?;
            let members = engine.members(&group_id)?;
            let week = engine.current_week(&group_id)?;
            print_json(&json!({ "group": group, "members": members, "currentWeek": week }))?;
        }
    }
    Ok(())
}
