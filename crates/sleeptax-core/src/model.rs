//! Plain data records shared by the engines and the storage collaborator.
//!
//! All records are snapshots: the engines receive owned copies from the
//! store and never hold references across calls.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A user profile, owned by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
}

impl User {
    /// Build a profile, falling back to a generated avatar when none is given.
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        avatar_url: Option<String>,
    ) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            "User".to_string()
        } else {
            name
        };
        let avatar_url = avatar_url
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| fallback_avatar(&name));
        Self {
            id: id.into(),
            email: email.into(),
            name,
            avatar_url,
        }
    }
}

fn fallback_avatar(name: &str) -> String {
    let encoded = urlencoding::encode(name);
    format!("https://ui-avatars.com/api/?name={encoded}&background=3B82F6&color=fff")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    /// Join code shared with friends.
    pub code: String,
    pub created_at: DateTime<Utc>,
}

/// One competition week of a group.
///
/// Exactly one week per group is active; closing it happens only through
/// a rollover that opens the successor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub id: String,
    pub group_id: String,
    pub week_number: u32,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub winner_id: Option<String>,
}

impl Week {
    /// A freshly opened week.
    pub fn open(group_id: impl Into<String>, week_number: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_id: group_id.into(),
            week_number,
            is_active: true,
            start_date: now,
            end_date: None,
            winner_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPledge {
    pub id: String,
    pub week_id: String,
    pub user_id: String,
    /// Dollars, 0 through the configured maximum.
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// One night of sleep, keyed by the calendar date the user woke up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepEntry {
    pub id: String,
    pub user_id: String,
    pub week_id: String,
    pub wake_date: NaiveDate,
    pub hours: f64,
    pub logged_at: DateTime<Utc>,
}

/// Derived ranking row. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub user: User,
    pub total_hours: f64,
    pub streak: u32,
    pub tax_pledged: f64,
    pub rank: u32,
    pub entries_count: u32,
}

/// A user's entries for one week plus their cross-week streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: String,
    pub week_id: String,
    pub entries: Vec<SleepEntry>,
    pub streak: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_avatar_encodes_name() {
        let user = User::new("u1", "a@b.c", "Ana María", None);
        assert_eq!(
            user.avatar_url,
            "https://ui-avatars.com/api/?name=Ana%20Mar%C3%ADa&background=3B82F6&color=fff"
        );
    }

    #[test]
    fn blank_name_defaults_to_user() {
        let user = User::new("u1", "", "  ", Some("https://x/y.png".into()));
        assert_eq!(user.name, "User");
        assert_eq!(user.avatar_url, "https://x/y.png");
    }

    #[test]
    fn records_serialize_camel_case() {
        let week = Week::open("g1", 3, Utc::now());
        let json = serde_json::to_value(&week).unwrap();
        assert_eq!(json["weekNumber"], 3);
        assert_eq!(json["isActive"], true);
        assert!(json["endDate"].is_null());
    }
}
