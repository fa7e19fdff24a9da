//! Consecutive-night sleep streaks.
//!
//! A streak counts back from the most recent entry over nights that met
//! the minimum-sleep threshold. It is only live while the most recent
//! entry woke up today or yesterday; anything older scores zero no matter
//! how long the run behind it was.

use chrono::NaiveDate;

use crate::model::SleepEntry;

/// Default minimum hours for a night to extend a streak.
pub const MIN_STREAK_HOURS: f64 = 7.5;

/// Compute `user_id`'s current streak from their full entry history.
///
/// `entries` may contain other users' entries and may span any number of
/// weeks; only `user_id`'s are considered. `today` is the local calendar
/// date of evaluation.
///
/// Duplicate wake dates are not collapsed. Each one is walked like any
/// other entry (a zero-day gap), so a duplicate meeting the threshold adds
/// to the count. The stores prevent duplicates per (user, date).
pub fn compute_streak(
    user_id: &str,
    entries: &[SleepEntry],
    today: NaiveDate,
    min_hours: f64,
) -> u32 {
    let mut history: Vec<&SleepEntry> = entries.iter().filter(|e| e.user_id == user_id).collect();
    // Stable, so same-date entries keep their input order.
    history.sort_by(|a, b| b.wake_date.cmp(&a.wake_date));

    let Some(latest) = history.first() else {
        return 0;
    };

    let yesterday = today.pred_opt().unwrap_or(today);
    if latest.wake_date != today && latest.wake_date != yesterday {
        return 0;
    }

    let mut streak = 0;
    let mut current = latest.wake_date;
    for entry in history {
        let gap = (current - entry.wake_date).num_days().abs();
        if gap > 1 && streak > 0 {
            break;
        }
        if entry.hours >= min_hours {
            streak += 1;
            current = entry.wake_date;
        } else {
            break;
        }
    }
    streak
}
