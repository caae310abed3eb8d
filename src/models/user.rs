use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One wallet identity.
///
/// Users are created the first time a wallet address authenticates and are
/// never deleted. The metric fields (`energy_level`, `daily_streak`,
/// `total_manifestations`, `completed_count`) are a cache: the
/// [`PersonalStore`](crate::store::PersonalStore) rewrites them after every
/// mutation and they can always be re-derived from the user's manifestations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub wallet_address: String,
    /// Explicit display name. See [`User::display_name`] for the fallback.
    pub name: Option<String>,
    pub energy_level: u8,
    pub daily_streak: u32,
    pub total_manifestations: u32,
    pub completed_count: u32,
    /// Today's intent. Setting it overwrites the previous value.
    pub daily_intent: Option<String>,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => short_address(&self.wallet_address),
        }
    }

    pub fn has_daily_intent(&self) -> bool {
        self.daily_intent
            .as_deref()
            .is_some_and(|intent| !intent.trim().is_empty())
    }
}

/// `0x1234567890abcdef` becomes `User 0x1234...cdef`.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("User {}...{}", head, tail)
}

/// A historical record of an intent set on a given day.
///
/// The current intent lives on [`User::daily_intent`]; these records are the
/// append-only trail, one per non-blank `set_daily_intent` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyIntent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub intent: String,
    pub date: NaiveDate,
    /// Energy points the intent contributes while it is set.
    pub energy_boost: u8,
    pub created_at: DateTime<Utc>,
}

/// Input for setting today's intent. A blank intent clears it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDailyIntentInput {
    pub intent: String,
}

/// Input for a manual energy boost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoostEnergyInput {
    pub amount: u8,
}
