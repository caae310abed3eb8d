//! State transitions and field edits on a single manifestation.
//!
//! Both operations validate everything before touching the entry, so an
//! `Err` always leaves the manifestation exactly as it was (including
//! `updated_at`).

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::{
    clamp_progress, normalize_title, EditManifestationInput, Manifestation, ManifestationState,
};

/// Move `manifestation` to `target`, which must be the designated successor
/// of its current state.
pub fn advance_state(
    manifestation: &mut Manifestation,
    target: ManifestationState,
    now: DateTime<Utc>,
) -> Result<()> {
    let from = manifestation.state;
    if from.successor() != Some(target) {
        return Err(Error::InvalidTransition { from, to: target });
    }

    manifestation.state = target;
    touch(manifestation, now);
    Ok(())
}

/// Apply a partial edit. Allowed from any state except `Archived`; never
/// changes the lifecycle state.
pub fn edit_fields(
    manifestation: &mut Manifestation,
    input: EditManifestationInput,
    now: DateTime<Utc>,
) -> Result<()> {
    if manifestation.state == ManifestationState::Archived {
        return Err(Error::validation("archived manifestations cannot be edited"));
    }

    let title = match input.title.as_deref() {
        Some(title) => normalize_title(title)
            .ok_or_else(|| Error::validation("title must not be empty"))?
            .to_string(),
        None => manifestation.title.clone(),
    };

    manifestation.title = title;
    if let Some(description) = input.description {
        manifestation.description = non_blank(description);
    }
    if let Some(emoji) = input.emoji {
        manifestation.emoji = emoji;
    }
    if let Some(category) = input.category {
        manifestation.category = non_blank(category);
    }
    if let Some(tags) = input.tags {
        manifestation.tags = tags;
    }
    if let Some(progress) = input.progress {
        manifestation.progress = clamp_progress(progress);
    }
    if let Some(is_public) = input.is_public {
        manifestation.is_public = is_public;
    }
    touch(manifestation, now);
    Ok(())
}

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

// Never let a lagging clock push updated_at before created_at.
fn touch(manifestation: &mut Manifestation, now: DateTime<Utc>) {
    manifestation.updated_at = now.max(manifestation.created_at);
}
