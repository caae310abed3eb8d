use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::manifestation::{Manifestation, ManifestationState};
use super::user::User;

/// A published copy of a manifestation with social state attached.
///
/// Publishing snapshots the source entry: later edits to the personal
/// entry are not reflected here. `likes` and `supporters` hold wallet
/// addresses and never contain duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityManifestation {
    pub id: Uuid,
    /// The personal manifestation this was published from.
    pub source_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub emoji: String,
    pub state: ManifestationState,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub progress: u8,
    pub author: Author,
    pub likes: Vec<String>,
    pub supporters: Vec<String>,
    pub comments: Vec<CommunityComment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shared_at: DateTime<Utc>,
}

impl CommunityManifestation {
    /// Snapshot `source` into a fresh pool entry with no social state.
    pub fn from_source(source: &Manifestation, author: Author, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: source.id,
            title: source.title.clone(),
            description: source.description.clone(),
            emoji: source.emoji.clone(),
            state: source.state,
            category: source.category.clone(),
            tags: source.tags.clone(),
            progress: source.progress,
            author,
            likes: Vec::new(),
            supporters: Vec::new(),
            comments: Vec::new(),
            created_at: source.created_at,
            updated_at: source.updated_at,
            shared_at: now,
        }
    }

    /// Likes plus supports; used for the popularity sort and totals.
    pub fn popularity(&self) -> usize {
        self.likes.len() + self.supporters.len()
    }

    pub fn addresses(&self, kind: InteractionKind) -> &[String] {
        match kind {
            InteractionKind::Like => &self.likes,
            InteractionKind::Support => &self.supporters,
        }
    }

    pub(crate) fn addresses_mut(&mut self, kind: InteractionKind) -> &mut Vec<String> {
        match kind {
            InteractionKind::Like => &mut self.likes,
            InteractionKind::Support => &mut self.supporters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub address: String,
    pub verified: bool,
}

impl Author {
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.display_name(),
            address: user.wallet_address.clone(),
            verified: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub name: String,
    pub address: String,
}

impl CommentAuthor {
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.display_name(),
            address: user.wallet_address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityComment {
    pub id: Uuid,
    pub author: CommentAuthor,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Input for commenting on a community manifestation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCommentInput {
    pub content: String,
}

/// The two toggleable social signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Support,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Support => "support",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "support" => Some(Self::Support),
            _ => None,
        }
    }
}

/// Aggregate view over the whole pool. Derived on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityStats {
    /// Distinct author addresses.
    pub total_dreamers: usize,
    /// Entries whose state is `Done`.
    pub total_manifested: usize,
    /// Sum of likes and supports across the pool.
    pub total_support: usize,
    pub category_counts: BTreeMap<String, usize>,
    pub trending_categories: Vec<TrendingCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingCategory {
    pub name: String,
    pub count: usize,
    pub emoji: String,
}
