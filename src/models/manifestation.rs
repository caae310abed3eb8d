use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Glyph used when an entry is created without one.
pub const DEFAULT_EMOJI: &str = "✨";

/// A tracked personal goal.
///
/// Entries are exclusively owned by one [`User`](super::User). Every mutation
/// goes through the [`lifecycle`](crate::lifecycle) functions, which keep
/// `updated_at >= created_at` and `progress` within `0..=100`.
///
/// # Lifecycle
/// Entries start as `Dream` and move strictly forward:
/// Dream → Working → Done → Archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifestation {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub emoji: String,
    pub state: ManifestationState,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Percent complete. Only meaningful while `Working`.
    pub progress: u8,
    /// Whether the entry may be published to the community pool.
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The lifecycle state of a manifestation.
///
/// - `Dream`: Recorded, not yet started
/// - `Working`: Actively being worked on
/// - `Done`: Achieved
/// - `Archived`: Put away; no further transitions or edits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ManifestationState {
    Dream,
    Working,
    Done,
    Archived,
}

impl ManifestationState {
    pub const ALL: [Self; 4] = [Self::Dream, Self::Working, Self::Done, Self::Archived];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dream => "dream",
            Self::Working => "working",
            Self::Done => "done",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dream" => Some(Self::Dream),
            "working" => Some(Self::Working),
            "done" => Some(Self::Done),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// The only state this one may advance to. `Archived` is terminal.
    pub fn successor(&self) -> Option<Self> {
        match self {
            Self::Dream => Some(Self::Working),
            Self::Working => Some(Self::Done),
            Self::Done => Some(Self::Archived),
            Self::Archived => None,
        }
    }
}

/// Input for creating a new manifestation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateManifestationInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to [`DEFAULT_EMOJI`] when omitted.
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl CreateManifestationInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Input for editing an existing manifestation. All fields are optional for
/// partial updates; the lifecycle state is never changed by an edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditManifestationInput {
    pub title: Option<String>,
    /// A blank value clears the description.
    pub description: Option<String>,
    pub emoji: Option<String>,
    /// A blank value clears the category.
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Any integer is accepted and clamped into `0..=100`.
    pub progress: Option<i64>,
    pub is_public: Option<bool>,
}

/// Input for moving a manifestation to its next lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdvanceStateInput {
    pub state: ManifestationState,
}

/// Per-state counts over one user's manifestations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestationStats {
    pub total: usize,
    pub dream: usize,
    pub working: usize,
    pub done: usize,
    pub archived: usize,
}

impl ManifestationStats {
    pub fn tally<'a>(manifestations: impl IntoIterator<Item = &'a Manifestation>) -> Self {
        let mut stats = Self::default();
        for m in manifestations {
            stats.total += 1;
            match m.state {
                ManifestationState::Dream => stats.dream += 1,
                ManifestationState::Working => stats.working += 1,
                ManifestationState::Done => stats.done += 1,
                ManifestationState::Archived => stats.archived += 1,
            }
        }
        stats
    }
}

/// Returns the trimmed title, or `None` if nothing is left after trimming.
pub fn normalize_title(title: &str) -> Option<&str> {
    let trimmed = title.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub fn clamp_progress(progress: i64) -> u8 {
    progress.clamp(0, 100) as u8
}
