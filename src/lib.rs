//! Manifestation journal engine.
//!
//! Users record "manifestations" (personal goals) that move through a fixed
//! lifecycle, set a daily intent, and accrue a derived energy level. Entries
//! can be shared to a community pool where other wallets like and support them.
//!
//! The crate is organised leaf-first:
//!
//! - [`models`]: entity definitions and validators.
//! - [`lifecycle`]: state transitions and field edits on a single entry.
//! - [`metrics`]: energy level and daily streak computation.
//! - [`store`]: one user's entries plus derived metrics, persisted atomically.
//! - [`community`]: the shared pool, its statistics and feed queries.
//! - [`db`]: the persistence collaborator and its SQLite implementation.
//! - [`api`]: the HTTP surface used by the rendering layer.

pub mod api;
pub mod clock;
pub mod community;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod models;
pub mod store;

pub use error::{Error, Result};
