use chrono::NaiveDate;
use clap::Subcommand;
use sleeptax_core::parse_wake_date;

use crate::common::{engine, load_config, print_json, CmdResult};

#[derive(Subcommand)]
pub enum EntryAction {
    /// List entries: yours by default, or everyone's for one week
    List {
        /// Only your entries waking on or after this date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "week")]
        since: Option<String>,
        /// All entries of a week
        #[arg(long)]
        week: Option<String>,
    },
    /// Replace the hours of one of your entries
    Amend {
        /// Entry id
        id: String,
        /// New hours
        #[arg(allow_negative_numbers = true)]
        hours: f64,
    },
    /// Delete one of your entries
    Delete {
        /// Entry id
        id: String,
    },
}

pub fn run(action: EntryAction) -> CmdResult {
    let config = load_config()?;
    let engine = engine(&config)?;

    match action {
        EntryAction::List { since, week } => {
            let entries = match week {
                Some(week_id) => engine.entries_for_week(&week_id)?,
                None => {
                    let since = match since {
                        Some(s) => parse_wake_date(&s)?,
                        None => NaiveDate::MIN,
                    };
                    engine.my_entries_since(since)?
                }
            };
            print_json(&entries)?;
        }
        EntryAction::Amend { id, hours } => print_json(&engine.amend_entry(&id, hours)?)?,
        EntryAction::Delete { id } => {
            engine.delete_entry(&id)?;
            println!("deleted {id}");
        }
    }
    Ok(())
}
