use clap::{Args, Subcommand};

use crate::common::{engine, load_config, print_json, selected_group, CmdResult};

#[derive(Args)]
#[command(args_conflicts_with_subcommands = true)]
pub struct PledgeArgs {
    #[command(subcommand)]
    action: Option<PledgeAction>,
    /// Dollars to pledge for the active week
    #[arg(allow_negative_numbers = true)]
    amount: Option<f64>,
}

#[derive(Subcommand)]
pub enum PledgeAction {
    /// Show your pledge for the active week
    Show,
}

pub fn run(args: PledgeArgs) -> CmdResult {
    let config = load_config()?;
    let engine = engine(&config)?;
    let week = engine.current_week(selected_group(&config)?)?;

    match (args.action, args.amount) {
        (Some(PledgeAction::Show), _) => print_json(&engine.my_pledge(&week.id)?)?,
        (None, Some(amount)) => print_json(&engine.pledge_sleep_tax(&week.id, amount)?)?,
        (None, None) => return Err("missing pledge amount (or `pledge show`)".into()),
    }
    Ok(())
}
