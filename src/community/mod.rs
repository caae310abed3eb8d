//! The shared community pool.
//!
//! Unlike a [`PersonalStore`](crate::store::PersonalStore), the pool is
//! mutated by many wallets at once. All writes go through one lock, and a
//! toggle only flips the caller's own membership in the like/support set, so
//! concurrent toggles from different addresses on the same entry are all
//! kept. Reads take a snapshot and run the pure projections in [`feed`].

pub mod feed;

use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::db::Repository;
use crate::error::{Error, Result};
use crate::models::*;

pub use feed::{category_emoji, compute_stats, FeedQuery, FeedSort};

/// Handle to the pool. Clones share the same entries.
pub struct CommunityPool<R: Repository> {
    repo: R,
    clock: Arc<dyn Clock>,
    entries: Arc<RwLock<Vec<CommunityManifestation>>>,
}

impl<R: Repository + Clone> Clone for CommunityPool<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            clock: self.clock.clone(),
            entries: self.entries.clone(),
        }
    }
}

impl<R: Repository> CommunityPool<R> {
    pub fn load(repo: R) -> Result<Self> {
        Self::load_with_clock(repo, Arc::new(SystemClock))
    }

    pub fn load_with_clock(repo: R, clock: Arc<dyn Clock>) -> Result<Self> {
        let entries = repo.get_community_manifestations()?;
        tracing::debug!(entries = entries.len(), "Loaded community pool");
        Ok(Self {
            repo,
            clock,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Copy `source` into the pool. The copy does not follow later edits to
    /// the source, and each source can be published once.
    pub fn publish(&self, source: &Manifestation, author: Author) -> Result<CommunityManifestation> {
        if !source.is_public {
            return Err(Error::validation(
                "only public manifestations can be shared",
            ));
        }

        self.publish_with(source, author, |entry| {
            self.repo.insert_community_manifestation(entry)?;
            Ok(())
        })
    }

    /// Like [`publish`](Self::publish), but `persist` writes the new entry.
    /// Used when the entry must land in the same commit as other rows. The
    /// pool is only updated when `persist` succeeds.
    pub fn publish_with<F>(
        &self,
        source: &Manifestation,
        author: Author,
        persist: F,
    ) -> Result<CommunityManifestation>
    where
        F: FnOnce(&CommunityManifestation) -> Result<()>,
    {
        let mut entries = self.entries.write().expect("community pool lock poisoned");
        if entries.iter().any(|e| e.source_id == source.id) {
            return Err(Error::validation("manifestation has already been shared"));
        }

        let entry = CommunityManifestation::from_source(source, author, self.clock.now());
        persist(&entry)?;
        entries.insert(0, entry.clone());

        tracing::info!(id = %entry.id, source = %source.id, "Published to community");
        Ok(entry)
    }

    pub fn toggle_like(&self, id: Uuid, address: &str) -> Result<CommunityManifestation> {
        self.toggle(id, address, InteractionKind::Like)
    }

    pub fn toggle_support(&self, id: Uuid, address: &str) -> Result<CommunityManifestation> {
        self.toggle(id, address, InteractionKind::Support)
    }

    pub fn add_comment(
        &self,
        id: Uuid,
        author: CommentAuthor,
        content: &str,
    ) -> Result<CommunityComment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::validation("comment must not be empty"));
        }

        let mut entries = self.entries.write().expect("community pool lock poisoned");
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::community_not_found(id))?;

        let comment = CommunityComment {
            id: Uuid::new_v4(),
            author,
            content: content.to_string(),
            created_at: self.clock.now(),
        };
        self.repo.insert_comment(id, &comment)?;
        entry.comments.push(comment.clone());

        Ok(comment)
    }

    pub fn get(&self, id: Uuid) -> Result<CommunityManifestation> {
        self.entries
            .read()
            .expect("community pool lock poisoned")
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| Error::community_not_found(id))
    }

    /// The whole pool, most recently shared first.
    pub fn snapshot(&self) -> Vec<CommunityManifestation> {
        self.entries
            .read()
            .expect("community pool lock poisoned")
            .clone()
    }

    pub fn stats(&self) -> CommunityStats {
        let entries = self.entries.read().expect("community pool lock poisoned");
        compute_stats(&entries)
    }

    pub fn query(&self, query: &FeedQuery) -> Vec<CommunityManifestation> {
        let entries = self.entries.read().expect("community pool lock poisoned");
        query.apply(&entries)
    }

    fn toggle(
        &self,
        id: Uuid,
        address: &str,
        kind: InteractionKind,
    ) -> Result<CommunityManifestation> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::validation("address must not be empty"));
        }

        let mut entries = self.entries.write().expect("community pool lock poisoned");
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::community_not_found(id))?;

        let present = !entry.addresses(kind).iter().any(|a| a == address);
        self.repo
            .set_interaction(id, address, kind, present, self.clock.now())?;

        let members = entry.addresses_mut(kind);
        if present {
            members.push(address.to_string());
        } else {
            members.retain(|a| a != address);
        }

        tracing::debug!(id = %id, kind = kind.as_str(), present, "Toggled interaction");
        Ok(entry.clone())
    }
}
