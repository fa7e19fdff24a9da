//! # SleepTax Core Library
//!
//! Core logic for SleepTax, a social accountability game for sleep: friends
//! join a group, pledge a weekly "tax", log nightly sleep, and compete on a
//! leaderboard of total hours with streaks for consecutive good nights.
//!
//! ## Architecture
//!
//! - **Streak Engine**: consecutive nights at or above the threshold,
//!   anchored at today or yesterday
//! - **Leaderboard/Week Engine**: pledge-gated logging, weekly rankings and
//!   the owner-only week rollover
//! - **Storage**: the [`SleepStore`] seam with in-memory and SQLite
//!   implementations, plus TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SleepTax`]: the operations a front end calls
//! - [`compute_streak`]: pure streak calculation
//! - [`SqliteStore`] / [`MemoryStore`]: record stores
//! - [`Config`]: rules and session configuration

pub mod demo;
pub mod engine;
pub mod error;
pub mod identity;
pub mod leaderboard;
pub mod model;
pub mod storage;
pub mod streak;

pub use engine::{parse_wake_date, SleepTax};
pub use error::{ConfigError, CoreError, StoreError};
pub use identity::{Clock, FixedClock, IdentityProvider, SessionIdentity, SystemClock};
pub use model::{Group, LeaderboardEntry, SleepEntry, User, UserStats, Week, WeeklyPledge};
pub use storage::{Config, MemoryStore, Rules, SessionConfig, SleepStore, SqliteStore};
pub use streak::{compute_streak, MIN_STREAK_HOURS};
