//! # Proficiency Records
//!
//! Reading and updating a user's per-skill proficiency.
//!
//! An update validates its input before touching the store, then delegates
//! the lookup-before-insert to `SkillStore::upsert_proficiency`, which keeps
//! one record per (user, skill) pair.

use crate::storage::SkillStore;
use crate::{Proficiency, SkillError, SkillId, UserId, UserSkill};
use chrono::{DateTime, Utc};

/// A validated request to set one proficiency value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProficiencyUpdate {
    pub user_id: UserId,
    pub skill_id: SkillId,
    pub proficiency: Proficiency,
}

impl ProficiencyUpdate {
    /// Validate raw input: both ids required, proficiency in `0..=100`.
    pub fn parse(user_id: &str, skill_id: &str, proficiency: i64) -> Result<Self, SkillError> {
        Ok(Self {
            user_id: UserId::new(user_id)?,
            skill_id: SkillId::new(skill_id)?,
            proficiency: Proficiency::new(proficiency)?,
        })
    }
}

/// All proficiency records of a user.
pub fn get_user_skills<S: SkillStore + ?Sized>(
    store: &S,
    user: &UserId,
) -> Result<Vec<UserSkill>, SkillError> {
    store.user_skills(user)
}

/// Apply an update and return the resulting record.
///
/// Creates the record (confidence 0.8, both timestamps `now`) when the pair
/// has none yet; otherwise changes only proficiency and `last_updated`.
pub fn update_proficiency<S: SkillStore + ?Sized>(
    store: &mut S,
    update: &ProficiencyUpdate,
    now: DateTime<Utc>,
) -> Result<UserSkill, SkillError> {
    let record =
        store.upsert_proficiency(&update.user_id, &update.skill_id, update.proficiency, now)?;
    tracing::debug!(
        user = %record.user_id,
        skill = %record.skill_id,
        record = %record.id,
        proficiency = record.proficiency.value(),
        "proficiency updated"
    );
    Ok(record)
}

// =============================================================================
// TESTS
// =============================================================================
