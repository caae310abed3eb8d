//! Domain models for the manifestation journal.
//!
//! # Core Concepts
//!
//! ## Personal Entities
//!
//! - [`Manifestation`]: A user's goal entry, moving Dream → Working → Done → Archived.
//! - [`User`]: One per wallet address, carrying cached metrics (energy, streak, counts).
//! - [`DailyIntent`]: Append-only record of intents set per day.
//!
//! ## Shared Entities
//!
//! These live in the community pool and are decoupled from their personal source:
//!
//! - [`CommunityManifestation`]: Published snapshot with likes, supporters and comments.
//! - [`CommunityStats`]: Derived aggregate over the pool, recomputed on every read.

mod community;
mod manifestation;
mod user;

pub use community::*;
pub use manifestation::*;
pub use user::*;
