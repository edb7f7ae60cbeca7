//! # Document Storage
//!
//! The `SkillStore` trait is the data-access interface for the four
//! collections (`skills`, `skillCategories`, `userSkills`, `assessments`).
//! Every operation in the crate takes a store explicitly, so scoring and
//! session logic run unchanged against:
//! - `MemoryStore`: `BTreeMap` collections (tests, ephemeral runs)
//! - `RedbStore`: disk-backed ACID storage
//!
//! Lookups are equality filters on `userId` and `skillId`. There are no
//! secondary indexes; backends scan the collection.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::{
    AssessmentResult, Proficiency, RecordId, Skill, SkillCategory, SkillError, SkillId, UserId,
    UserSkill,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of documents per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCounts {
    pub skills: usize,
    pub skill_categories: usize,
    pub user_skills: usize,
    pub assessments: usize,
}

/// Data-access interface for SkillPath documents.
///
/// All fallible operations return `Result<T, SkillError>` so in-memory and
/// persistent backends behave uniformly. Store failures surface as
/// data-access errors (`SkillError::StoreUnavailable`,
/// `SkillError::SerializationError`).
pub trait SkillStore {
    // -------------------------------------------------------------------------
    // Reference data
    // -------------------------------------------------------------------------

    /// Full scan of the `skills` collection.
    fn skills(&self) -> Result<Vec<Skill>, SkillError>;

    /// Full scan of the `skillCategories` collection.
    fn categories(&self) -> Result<Vec<SkillCategory>, SkillError>;

    /// Insert or replace a skill under its own id.
    fn put_skill(&mut self, skill: Skill) -> Result<(), SkillError>;

    /// Insert or replace a category under its own id.
    fn put_category(&mut self, category: SkillCategory) -> Result<(), SkillError>;

    // -------------------------------------------------------------------------
    // Proficiency records
    // -------------------------------------------------------------------------

    /// All records owned by `user`.
    fn user_skills(&self, user: &UserId) -> Result<Vec<UserSkill>, SkillError>;

    /// Every record in the `userSkills` collection.
    fn all_user_skills(&self) -> Result<Vec<UserSkill>, SkillError>;

    /// The record for the (user, skill) pair, if one exists.
    fn find_user_skill(
        &self,
        user: &UserId,
        skill: &SkillId,
    ) -> Result<Option<UserSkill>, SkillError> {
        Ok(self
            .user_skills(user)?
            .into_iter()
            .find(|record| &record.skill_id == skill))
    }

    /// Set the proficiency of the (user, skill) pair.
    ///
    /// If a record exists, only `proficiency` and `last_updated` change.
    /// Otherwise a record is created with the default confidence and `now`
    /// for both timestamps. Lookup and insert are one operation, so a pair
    /// never gets two records.
    fn upsert_proficiency(
        &mut self,
        user: &UserId,
        skill: &SkillId,
        proficiency: Proficiency,
        now: DateTime<Utc>,
    ) -> Result<UserSkill, SkillError>;

    /// Store an existing record verbatim (used by snapshot import).
    ///
    /// Fails with `SkillError::InvalidRecord` if another record already
    /// holds the same (user, skill) pair, or if the id belongs to a record
    /// of a different pair. Records are never deleted, so a put may only
    /// replace the record of its own pair.
    fn put_user_skill(&mut self, record: UserSkill) -> Result<(), SkillError>;

    // -------------------------------------------------------------------------
    // Assessment log
    // -------------------------------------------------------------------------

    /// Append a result to the `assessments` log.
    ///
    /// A result without an id gets a store-assigned one. A result whose id
    /// is already logged fails with `SkillError::InvalidRecord`; the log is
    /// append-only. Returns the stored result.
    fn append_assessment(
        &mut self,
        result: AssessmentResult,
    ) -> Result<AssessmentResult, SkillError>;

    /// Results logged for `user`, oldest first.
    fn assessments(&self, user: &UserId) -> Result<Vec<AssessmentResult>, SkillError>;

    /// Every result in the `assessments` log.
    fn all_assessments(&self) -> Result<Vec<AssessmentResult>, SkillError>;

    // -------------------------------------------------------------------------
    // Metadata
    // -------------------------------------------------------------------------

    /// Reserve a fresh document id in `collection`.
    fn allocate_id(&mut self, collection: &'static str) -> Result<RecordId, SkillError>;

    /// Document counts per collection.
    fn counts(&self) -> Result<CollectionCounts, SkillError> {
        Ok(CollectionCounts {
            skills: self.skills()?.len(),
            skill_categories: self.categories()?.len(),
            user_skills: self.all_user_skills()?.len(),
            assessments: self.all_assessments()?.len(),
        })
    }
}

/// Check that `record` may be written next to `other`.
pub(crate) fn check_user_skill_slot(
    other: &UserSkill,
    record: &UserSkill,
) -> Result<(), SkillError> {
    let same_pair = other.user_id == record.user_id && other.skill_id == record.skill_id;
    if other.id == record.id && !same_pair {
        return Err(SkillError::InvalidRecord(format!(
            "record {} belongs to user {} skill {}",
            other.id, other.user_id, other.skill_id
        )));
    }
    if other.id != record.id && same_pair {
        return Err(SkillError::InvalidRecord(format!(
            "user {} already has a record for skill {}",
            record.user_id, record.skill_id
        )));
    }
    Ok(())
}

pub(crate) fn assessment_logged(id: &RecordId) -> SkillError {
    SkillError::InvalidRecord(format!("assessment {id} is already logged"))
}

/// Order assessments oldest first, ties broken by id.
pub(crate) fn sort_assessments(results: &mut [AssessmentResult]) {
    results.sort_by(|a, b| a.assessed_at.cmp(&b.assessed_at).then(a.id.cmp(&b.id)));
}
