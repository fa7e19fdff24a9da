//! Identity provider seam and the clock.
//!
//! Authentication itself happens elsewhere. The engine only asks who the
//! caller is and what time it is.

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::error::CoreError;
use crate::model::User;
use crate::storage::SessionConfig;

/// Who is calling.
pub trait IdentityProvider: Send + Sync {
    /// The authenticated user, or `None` when signed out.
    fn current_user(&self) -> Result<Option<User>, CoreError>;
}

/// Identity resolved once at sign-in and held for the session.
#[derive(Debug, Clone, Default)]
pub struct SessionIdentity {
    user: Option<User>,
}

impl SessionIdentity {
    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

impl From<&SessionConfig> for SessionIdentity {
    fn from(session: &SessionConfig) -> Self {
        Self {
            user: session.user(),
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user(&self) -> Result<Option<User>, CoreError> {
        Ok(self.user.clone())
    }
}

/// Source of "now" and the local calendar date.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The caller's local calendar date.
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the machine's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A frozen clock. `today` is taken as given rather than derived from
/// `now`, so tests can pin the local date independent of time zone.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

impl FixedClock {
    /// Noon UTC on `today`.
    pub fn on(today: NaiveDate) -> Self {
        let now = today
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self { now, today }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}
