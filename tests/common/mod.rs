use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use manifestation::db::{ChangeSet, Database, Repository};
use manifestation::models::*;
use uuid::Uuid;

/// Delegates to a real database but refuses every write while `fail` is set.
#[derive(Clone)]
pub struct FlakyRepo {
    pub inner: Database,
    pub fail: Arc<AtomicBool>,
}

impl FlakyRepo {
    pub fn new(inner: Database) -> Self {
        Self {
            inner,
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("disk unavailable");
        }
        Ok(())
    }
}

impl Repository for FlakyRepo {
    fn find_or_create_user(&self, candidate: &User) -> anyhow::Result<User> {
        self.inner.find_or_create_user(candidate)
    }

    fn get_manifestations_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Manifestation>> {
        self.inner.get_manifestations_by_owner(owner_id)
    }

    fn commit(&self, changes: &ChangeSet<'_>) -> anyhow::Result<()> {
        self.check()?;
        self.inner.commit(changes)
    }

    fn get_community_manifestations(&self) -> anyhow::Result<Vec<CommunityManifestation>> {
        self.inner.get_community_manifestations()
    }

    fn insert_community_manifestation(&self, entry: &CommunityManifestation) -> anyhow::Result<()> {
        self.check()?;
        self.inner.insert_community_manifestation(entry)
    }

    fn set_interaction(
        &self,
        manifestation_id: Uuid,
        address: &str,
        kind: InteractionKind,
        present: bool,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.check()?;
        self.inner
            .set_interaction(manifestation_id, address, kind, present, at)
    }

    fn insert_comment(&self, manifestation_id: Uuid, comment: &CommunityComment) -> anyhow::Result<()> {
        self.check()?;
        self.inner.insert_comment(manifestation_id, comment)
    }
}
