pub mod auth;
pub mod config;
pub mod demo;
pub mod entry;
pub mod group;
pub mod leaderboard;
pub mod log;
pub mod pledge;
pub mod stats;
pub mod week;
