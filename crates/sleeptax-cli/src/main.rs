use clap::{Parser, Subcommand};
use sleeptax_core::CoreError;

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "sleeptax", version, about = "SleepTax CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, sign out, show the signed-in user
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Create, join and inspect groups
    Group {
        #[command(subcommand)]
        action: commands::group::GroupAction,
    },
    /// Weekly rounds
    Week {
        #[command(subcommand)]
        action: commands::week::WeekAction,
    },
    /// Pledge this week's sleep tax
    Pledge(commands::pledge::PledgeArgs),
    /// Log a night's sleep
    Log(commands::log::LogArgs),
    /// List, amend and delete sleep entries
    Entry {
        #[command(subcommand)]
        action: commands::entry::EntryAction,
    },
    /// Weekly leaderboard
    Leaderboard(commands::leaderboard::LeaderboardArgs),
    /// Entries and streak for one user
    Stats(commands::stats::StatsArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Leaderboard of the built-in demo group
    Demo(commands::demo::DemoArgs),
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SLEEPTAX_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Group { action } => commands::group::run(action),
        Commands::Week { action } => commands::week::run(action),
        Commands::Pledge(args) => commands::pledge::run(args),
        Commands::Log(args) => commands::log::run(args),
        Commands::Entry { action } => commands::entry::run(action),
        Commands::Leaderboard(args) => commands::leaderboard::run(args),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Demo(args) => commands::demo::run(args),
    };

    if let Err(e) = result {
        let code = e
            .downcast_ref::<CoreError>()
            .map_or("ERROR", CoreError::code);
        let body = serde_json::json!({ "error": { "code": code, "message": e.to_string() } });
        eprintln!("{body}");
        std::process::exit(1);
    }
}
