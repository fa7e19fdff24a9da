use clap::Args;
use sleeptax_core::parse_wake_date;

use crate::common::{engine, load_config, print_json, selected_group, CmdResult};

#[derive(Args)]
pub struct LogArgs {
    /// Wake date (YYYY-MM-DD)
    wake_date: String,
    /// Hours slept
    #[arg(allow_negative_numbers = true)]
    hours: f64,
}

pub fn run(args: LogArgs) -> CmdResult {
    let wake_date = parse_wake_date(&args.wake_date)?;
    let config = load_config()?;
    let engine = engine(&config)?;
    let entry = engine.log_sleep(selected_group(&config)?, wake_date, args.hours)?;
    print_json(&entry)
}
