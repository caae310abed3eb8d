//! Energy level and daily streak.
//!
//! Everything here is a pure function of its inputs. The store feeds in the
//! current manifestation set and the user's previous streak bookkeeping, and
//! writes the returned [`Metrics`] back onto the [`User`] cache.
//!
//! ```text
//! energy = 25
//!        + min(total * 3, 30)
//!        + completed * 15
//!        + (intent set ? 8 : 0)
//!        + min(streak * 2, 25)
//!        + working * 5
//! clamped to 0..=100
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Manifestation, ManifestationState, User};

pub const BASE_ENERGY: u64 = 25;
pub const VOLUME_BONUS_PER_ENTRY: u64 = 3;
pub const VOLUME_BONUS_CAP: u64 = 30;
pub const COMPLETION_BONUS: u64 = 15;
pub const INTENT_BONUS: u8 = 8;
pub const STREAK_BONUS_PER_DAY: u64 = 2;
pub const STREAK_BONUS_CAP: u64 = 25;
pub const WORKING_BONUS: u64 = 5;
pub const MAX_ENERGY: u8 = 100;

/// Everything the metric functions look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsInput {
    pub total_manifestations: u32,
    pub completed_count: u32,
    pub working_count: u32,
    pub daily_intent_set: bool,
    pub daily_streak: u32,
    pub last_active_at: DateTime<Utc>,
}

impl MetricsInput {
    pub fn from_user(user: &User, manifestations: &[Manifestation]) -> Self {
        let count = |state| {
            manifestations
                .iter()
                .filter(|m| m.state == state)
                .count() as u32
        };
        Self {
            total_manifestations: manifestations.len() as u32,
            completed_count: count(ManifestationState::Done),
            working_count: count(ManifestationState::Working),
            daily_intent_set: user.has_daily_intent(),
            daily_streak: user.daily_streak,
            last_active_at: user.last_active_at,
        }
    }
}

/// The derived fields cached on a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub energy_level: u8,
    pub daily_streak: u32,
    pub last_active_at: DateTime<Utc>,
    pub total_manifestations: u32,
    pub completed_count: u32,
}

impl Metrics {
    pub fn apply_to(&self, user: &mut User) {
        user.energy_level = self.energy_level;
        user.daily_streak = self.daily_streak;
        user.last_active_at = self.last_active_at;
        user.total_manifestations = self.total_manifestations;
        user.completed_count = self.completed_count;
    }
}

pub fn energy_level(
    total_manifestations: u32,
    completed_count: u32,
    working_count: u32,
    daily_intent_set: bool,
    daily_streak: u32,
) -> u8 {
    let volume = (u64::from(total_manifestations) * VOLUME_BONUS_PER_ENTRY).min(VOLUME_BONUS_CAP);
    let completion = u64::from(completed_count) * COMPLETION_BONUS;
    let intent = if daily_intent_set {
        u64::from(INTENT_BONUS)
    } else {
        0
    };
    let loyalty = (u64::from(daily_streak) * STREAK_BONUS_PER_DAY).min(STREAK_BONUS_CAP);
    let active = u64::from(working_count) * WORKING_BONUS;

    let energy = BASE_ENERGY + volume + completion + intent + loyalty + active;
    energy.min(u64::from(MAX_ENERGY)) as u8
}

/// Streak after one activity-triggering action at `now`.
///
/// Only an exact one-day gap extends the streak; a longer gap restarts it at
/// one, and repeated activity on the same day leaves it alone.
pub fn next_streak(
    daily_streak: u32,
    last_active_at: DateTime<Utc>,
    now: DateTime<Utc>,
    has_activity: bool,
) -> u32 {
    if !has_activity {
        return daily_streak;
    }

    let days_since_last_active = (now - last_active_at).num_days();
    match days_since_last_active {
        1 => daily_streak.saturating_add(1),
        d if d > 1 => 1,
        _ => daily_streak,
    }
}

/// Full evaluation for an activity-triggering action (create, state change,
/// intent set): update the streak, refresh `last_active_at`, recompute energy
/// with the new streak.
pub fn evaluate(input: &MetricsInput, now: DateTime<Utc>) -> Metrics {
    let has_activity = input.daily_intent_set || input.total_manifestations > 0;
    let daily_streak = next_streak(input.daily_streak, input.last_active_at, now, has_activity);

    Metrics {
        energy_level: energy_level(
            input.total_manifestations,
            input.completed_count,
            input.working_count,
            input.daily_intent_set,
            daily_streak,
        ),
        daily_streak,
        last_active_at: now,
        total_manifestations: input.total_manifestations,
        completed_count: input.completed_count,
    }
}

/// Recount without treating the change as activity: streak and
/// `last_active_at` carry over untouched.
pub fn refresh(input: &MetricsInput) -> Metrics {
    Metrics {
        energy_level: energy_level(
            input.total_manifestations,
            input.completed_count,
            input.working_count,
            input.daily_intent_set,
            input.daily_streak,
        ),
        daily_streak: input.daily_streak,
        last_active_at: input.last_active_at,
        total_manifestations: input.total_manifestations,
        completed_count: input.completed_count,
    }
}
