//! One authenticated user's manifestations and derived metrics.
//!
//! The store keeps the user's rows in memory and is the source of truth for
//! reads. Every mutation follows the same shape:
//!
//! 1. clone the affected state into a staging copy,
//! 2. apply the lifecycle change and recompute metrics on the copy,
//! 3. hand the resulting rows to the [`Repository`] as one [`ChangeSet`],
//! 4. promote the copy only if the commit succeeded.
//!
//! A failed commit therefore leaves the store exactly as it was and surfaces
//! [`Error::Persistence`].

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::community::CommunityPool;
use crate::db::{ChangeSet, ManifestationWrite, Repository};
use crate::error::{Error, Result};
use crate::lifecycle;
use crate::metrics::{self, Metrics, MetricsInput};
use crate::models::*;

/// Largest single manual energy increment.
pub const MAX_ENERGY_BOOST: u8 = 15;

pub struct PersonalStore<R: Repository> {
    repo: R,
    clock: Arc<dyn Clock>,
    user: User,
    manifestations: Vec<Manifestation>,
}

impl<R: Repository> std::fmt::Debug for PersonalStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonalStore")
            .field("user", &self.user.wallet_address)
            .field("manifestations", &self.manifestations.len())
            .finish()
    }
}

impl<R: Repository> PersonalStore<R> {
    /// Authenticate `wallet_address` and load its manifestations. The user
    /// row is created on first sight; reopening never duplicates it.
    pub fn open(repo: R, wallet_address: &str) -> Result<Self> {
        Self::open_with_clock(repo, wallet_address, Arc::new(SystemClock))
    }

    pub fn open_with_clock(repo: R, wallet_address: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        let wallet_address = wallet_address.trim();
        if wallet_address.is_empty() {
            return Err(Error::validation("wallet address must not be empty"));
        }

        let now = clock.now();
        let mut candidate = User {
            id: Uuid::new_v4(),
            wallet_address: wallet_address.to_string(),
            name: None,
            energy_level: 0,
            daily_streak: 0,
            total_manifestations: 0,
            completed_count: 0,
            daily_intent: None,
            last_active_at: now,
            created_at: now,
            updated_at: now,
        };
        metrics::refresh(&MetricsInput::from_user(&candidate, &[])).apply_to(&mut candidate);

        let mut user = repo.find_or_create_user(&candidate)?;
        let manifestations = repo.get_manifestations_by_owner(user.id)?;

        // The cached counts are only a cache; trust the rows if another
        // writer left them stale. A matching cache keeps any manual boost.
        let derived = metrics::refresh(&MetricsInput::from_user(&user, &manifestations));
        if derived.total_manifestations != user.total_manifestations
            || derived.completed_count != user.completed_count
        {
            tracing::warn!(
                wallet = %user.wallet_address,
                cached = user.total_manifestations,
                actual = derived.total_manifestations,
                "Cached metrics out of date, re-deriving"
            );
            derived.apply_to(&mut user);
        }

        Ok(Self {
            repo,
            clock,
            user,
            manifestations,
        })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// All manifestations, in creation order.
    pub fn list(&self) -> &[Manifestation] {
        &self.manifestations
    }

    /// Manifestations in one state, most recently updated first.
    pub fn list_by_state(&self, state: ManifestationState) -> Vec<&Manifestation> {
        let mut matching: Vec<_> = self
            .manifestations
            .iter()
            .filter(|m| m.state == state)
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matching
    }

    pub fn get(&self, id: Uuid) -> Result<&Manifestation> {
        self.manifestations
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::manifestation_not_found(id))
    }

    pub fn stats(&self) -> ManifestationStats {
        ManifestationStats::tally(&self.manifestations)
    }

    /// Metrics re-derived from the raw rows, ignoring the cached user fields
    /// except the streak bookkeeping. Equal to the cache after any mutation
    /// other than a manual energy boost.
    pub fn derived_metrics(&self) -> Metrics {
        metrics::refresh(&MetricsInput::from_user(&self.user, &self.manifestations))
    }

    pub fn create(&mut self, input: CreateManifestationInput) -> Result<Manifestation> {
        let title = normalize_title(&input.title)
            .ok_or_else(|| Error::validation("title must not be empty"))?
            .to_string();

        let now = self.clock.now();
        let manifestation = Manifestation {
            id: Uuid::new_v4(),
            owner_id: self.user.id,
            title,
            description: input.description,
            emoji: input
                .emoji
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
            state: ManifestationState::Dream,
            category: input.category,
            tags: input.tags,
            progress: 0,
            is_public: input.is_public,
            created_at: now,
            updated_at: now,
        };

        let mut staged = self.manifestations.clone();
        staged.push(manifestation.clone());
        let user = self.recompute(&staged, true);

        self.commit(user, staged, ManifestationWrite::Insert(&manifestation))?;

        tracing::info!(id = %manifestation.id, title = %manifestation.title, "Created manifestation");
        Ok(manifestation)
    }

    pub fn advance(&mut self, id: Uuid, target: ManifestationState) -> Result<Manifestation> {
        let index = self.position(id)?;
        let now = self.clock.now();

        let mut staged = self.manifestations.clone();
        lifecycle::advance_state(&mut staged[index], target, now)?;
        let updated = staged[index].clone();
        let user = self.recompute(&staged, true);

        self.commit(user, staged, ManifestationWrite::Update(&updated))?;

        tracing::info!(id = %id, state = target.as_str(), "Advanced manifestation");
        Ok(updated)
    }

    pub fn edit(&mut self, id: Uuid, input: EditManifestationInput) -> Result<Manifestation> {
        let index = self.position(id)?;
        let now = self.clock.now();

        let mut staged = self.manifestations.clone();
        lifecycle::edit_fields(&mut staged[index], input, now)?;
        let updated = staged[index].clone();

        // Edits are not streak activity; only the user's timestamp moves.
        let mut user = self.user.clone();
        user.updated_at = now;

        self.commit(user, staged, ManifestationWrite::Update(&updated))?;

        tracing::debug!(id = %id, "Edited manifestation");
        Ok(updated)
    }

    /// Mark the entry public and publish a snapshot of it to `pool`.
    ///
    /// The source update and the pool entry are written in one commit, so a
    /// failure leaves the entry private and the pool unchanged. Archived
    /// entries cannot be shared, and each entry is shared at most once.
    pub fn share<P: Repository>(
        &mut self,
        id: Uuid,
        pool: &CommunityPool<P>,
    ) -> Result<CommunityManifestation> {
        let index = self.position(id)?;
        if self.manifestations[index].state == ManifestationState::Archived {
            return Err(Error::validation("archived manifestations cannot be shared"));
        }

        let now = self.clock.now();
        let mut staged = self.manifestations.clone();
        if !staged[index].is_public {
            let public = EditManifestationInput {
                is_public: Some(true),
                ..Default::default()
            };
            lifecycle::edit_fields(&mut staged[index], public, now)?;
        }
        let source = staged[index].clone();

        let mut user = self.user.clone();
        user.updated_at = now;

        let entry = pool.publish_with(&source, Author::from_user(&user), |entry| {
            self.persist(&ChangeSet {
                user: Some(&user),
                manifestation: Some(ManifestationWrite::Update(&source)),
                community: Some(entry),
                ..Default::default()
            })
        })?;
        self.user = user;
        self.manifestations = staged;

        Ok(entry)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<()> {
        let index = self.position(id)?;

        let mut staged = self.manifestations.clone();
        staged.remove(index);
        let user = self.recompute(&staged, false);

        self.commit(user, staged, ManifestationWrite::Delete(id))?;

        tracing::info!(id = %id, "Deleted manifestation");
        Ok(())
    }

    /// Overwrite today's intent. A blank intent clears it.
    pub fn set_daily_intent(&mut self, intent: &str) -> Result<User> {
        let now = self.clock.now();
        let trimmed = intent.trim();

        let record = (!trimmed.is_empty()).then(|| DailyIntent {
            id: Uuid::new_v4(),
            user_id: self.user.id,
            intent: trimmed.to_string(),
            date: now.date_naive(),
            energy_boost: metrics::INTENT_BONUS,
            created_at: now,
        });

        let mut user = self.user.clone();
        user.daily_intent = record.as_ref().map(|r| r.intent.clone());
        metrics::evaluate(&MetricsInput::from_user(&user, &self.manifestations), now)
            .apply_to(&mut user);
        user.updated_at = now;

        let changes = ChangeSet {
            user: Some(&user),
            daily_intent: record.as_ref(),
            ..Default::default()
        };
        self.persist(&changes)?;
        self.user = user.clone();

        tracing::info!(intent_set = record.is_some(), "Updated daily intent");
        Ok(user)
    }

    /// Bump energy by `amount` (1..=15), capped at 100. Transient: the next
    /// recomputation re-derives energy from the raw rows.
    pub fn boost_energy(&mut self, amount: u8) -> Result<User> {
        if amount == 0 || amount > MAX_ENERGY_BOOST {
            return Err(Error::validation(format!(
                "energy boost must be between 1 and {MAX_ENERGY_BOOST}"
            )));
        }

        let mut user = self.user.clone();
        user.energy_level = user
            .energy_level
            .saturating_add(amount)
            .min(metrics::MAX_ENERGY);
        user.updated_at = self.clock.now();

        self.persist(&ChangeSet {
            user: Some(&user),
            ..Default::default()
        })?;
        self.user = user.clone();

        tracing::debug!(energy = user.energy_level, "Boosted energy");
        Ok(user)
    }

    fn position(&self, id: Uuid) -> Result<usize> {
        self.manifestations
            .iter()
            .position(|m| m.id == id && m.owner_id == self.user.id)
            .ok_or_else(|| Error::manifestation_not_found(id))
    }

    /// A copy of the user with metrics recomputed over `staged`.
    fn recompute(&self, staged: &[Manifestation], activity: bool) -> User {
        let now = self.clock.now();
        let input = MetricsInput::from_user(&self.user, staged);
        let metrics = if activity {
            metrics::evaluate(&input, now)
        } else {
            metrics::refresh(&input)
        };

        let mut user = self.user.clone();
        metrics.apply_to(&mut user);
        user.updated_at = now;

        tracing::debug!(
            energy = metrics.energy_level,
            streak = metrics.daily_streak,
            "Recomputed metrics"
        );
        user
    }

    fn commit(
        &mut self,
        user: User,
        staged: Vec<Manifestation>,
        write: ManifestationWrite<'_>,
    ) -> Result<()> {
        self.persist(&ChangeSet {
            user: Some(&user),
            manifestation: Some(write),
            ..Default::default()
        })?;
        self.user = user;
        self.manifestations = staged;
        Ok(())
    }

    fn persist(&self, changes: &ChangeSet<'_>) -> Result<()> {
        self.repo.commit(changes).map_err(|e| {
            tracing::warn!(user = %self.user.wallet_address, "Commit failed, discarding staged changes: {:#}", e);
            Error::Persistence(e)
        })
    }
}
