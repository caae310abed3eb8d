use thiserror::Error;
use uuid::Uuid;

use crate::models::ManifestationState;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every way a journal operation can fail.
///
/// No variant carries a partially applied change: when an operation returns
/// an error, the in-memory state it was called on is exactly as before.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied data violates an invariant (blank title, bad amount).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The id does not exist, or is not owned by the caller.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// The requested state is not the successor of the current one.
    #[error("cannot move from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: ManifestationState,
        to: ManifestationState,
    },

    /// The backing store rejected or failed to complete a write.
    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn manifestation_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Manifestation",
            id,
        }
    }

    pub fn community_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Community manifestation",
            id,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::Persistence(e)
    }
}
