//! Weekly leaderboard ranking.
//!
//! Every group member gets a row, including members who have not logged
//! anything this week. Rows are ordered by total hours, descending; ties
//! keep member join order. Rank is the 1-based position after sorting.

use chrono::NaiveDate;

use crate::model::{LeaderboardEntry, SleepEntry, User, WeeklyPledge};
use crate::streak::compute_streak;

/// Rank `members` for `week_id`.
///
/// `entries` must hold each member's complete history: totals only count
/// entries of `week_id`, but streaks run across week boundaries.
pub fn rank(
    week_id: &str,
    members: &[User],
    entries: &[SleepEntry],
    pledges: &[WeeklyPledge],
    today: NaiveDate,
    min_streak_hours: f64,
) -> Vec<LeaderboardEntry> {
    let mut board: Vec<LeaderboardEntry> = members
        .iter()
        .map(|user| {
            let (total_hours, entries_count) = entries
                .iter()
                .filter(|e| e.week_id == week_id && e.user_id == user.id)
                .fold((0.0, 0u32), |(sum, n), e| (sum + e.hours, n + 1));
            let tax_pledged = pledges
                .iter()
                .find(|p| p.week_id == week_id && p.user_id == user.id)
                .map_or(0.0, |p| p.amount);

            LeaderboardEntry {
                user_id: user.id.clone(),
                user: user.clone(),
                total_hours,
                streak: compute_streak(&user.id, entries, today, min_streak_hours),
                tax_pledged,
                rank: 0,
                entries_count,
            }
        })
        .collect();

    board.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
    for (i, row) in board.iter_mut().enumerate() {
        row.rank = i as u32 + 1;
    }
    board
}

/// The week's winner: the top-ranked row, provided it logged at least once.
pub fn winner(board: &[LeaderboardEntry]) -> Option<&LeaderboardEntry> {
    board.first().filter(|row| row.entries_count > 0)
}
