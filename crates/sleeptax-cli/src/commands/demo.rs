use std::sync::Arc;

use clap::Args;
use sleeptax_core::demo::{demo_owner, seed_demo, DEMO_WEEK_ID};
use sleeptax_core::{
    parse_wake_date, Clock, FixedClock, MemoryStore, SessionIdentity, SleepTax, SystemClock,
};

use crate::common::{print_json, CmdResult};

#[derive(Args)]
pub struct DemoArgs {
    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long)]
    today: Option<String>,
}

/// Seeds an in-memory store; nothing touches the configured database.
pub fn run(args: DemoArgs) -> CmdResult {
    let clock = match args.today {
        Some(s) => FixedClock::on(parse_wake_date(&s)?),
        None => FixedClock {
            now: SystemClock.now(),
            today: SystemClock.today(),
        },
    };
    let store = Arc::new(MemoryStore::new());
    seed_demo(store.as_ref(), clock.today, clock.now)?;

    let engine = SleepTax::new(store, SessionIdentity::signed_in(demo_owner())).with_clock(clock);
    print_json(&engine.get_leaderboard(DEMO_WEEK_ID)?)
}
