//! # In-Memory Store
//!
//! `BTreeMap` collections for tests and ephemeral sessions.
//! Volatile unless exported with a snapshot.

use super::{SkillStore, assessment_logged, check_user_skill_slot, sort_assessments};
use crate::primitives::{
    ASSESSMENTS_COLLECTION, CATEGORIES_COLLECTION, SKILLS_COLLECTION, USER_SKILLS_COLLECTION,
};
use crate::{
    AssessmentResult, CategoryId, Confidence, Proficiency, RecordId, Skill, SkillCategory,
    SkillError, SkillId, UserId, UserSkill,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// In-memory document store.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    skills: BTreeMap<SkillId, Skill>,
    categories: BTreeMap<CategoryId, SkillCategory>,
    user_skills: BTreeMap<RecordId, UserSkill>,
    assessments: BTreeMap<RecordId, AssessmentResult>,
    /// Last id handed out per collection.
    counters: BTreeMap<&'static str, u64>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn id_taken(&self, collection: &str, candidate: &str) -> bool {
        match collection {
            SKILLS_COLLECTION => self.skills.keys().any(|k| k.as_str() == candidate),
            CATEGORIES_COLLECTION => self.categories.keys().any(|k| k.as_str() == candidate),
            USER_SKILLS_COLLECTION => self.user_skills.keys().any(|k| k.as_str() == candidate),
            ASSESSMENTS_COLLECTION => self.assessments.keys().any(|k| k.as_str() == candidate),
            _ => false,
        }
    }
}

impl SkillStore for MemoryStore {
    fn skills(&self) -> Result<Vec<Skill>, SkillError> {
        Ok(self.skills.values().cloned().collect())
    }

    fn categories(&self) -> Result<Vec<SkillCategory>, SkillError> {
        Ok(self.categories.values().cloned().collect())
    }

    fn put_skill(&mut self, skill: Skill) -> Result<(), SkillError> {
        skill.validate()?;
        self.skills.insert(skill.id.clone(), skill);
        Ok(())
    }

    fn put_category(&mut self, category: SkillCategory) -> Result<(), SkillError> {
        self.categories.insert(category.id.clone(), category);
        Ok(())
    }

    fn user_skills(&self, user: &UserId) -> Result<Vec<UserSkill>, SkillError> {
        Ok(self
            .user_skills
            .values()
            .filter(|record| &record.user_id == user)
            .cloned()
            .collect())
    }

    fn all_user_skills(&self) -> Result<Vec<UserSkill>, SkillError> {
        Ok(self.user_skills.values().cloned().collect())
    }

    fn upsert_proficiency(
        &mut self,
        user: &UserId,
        skill: &SkillId,
        proficiency: Proficiency,
        now: DateTime<Utc>,
    ) -> Result<UserSkill, SkillError> {
        let existing = self
            .user_skills
            .values_mut()
            .find(|record| &record.user_id == user && &record.skill_id == skill);

        if let Some(record) = existing {
            record.proficiency = proficiency;
            record.last_updated = now;
            return Ok(record.clone());
        }

        let id = self.allocate_id(USER_SKILLS_COLLECTION)?;
        let record = UserSkill {
            id: id.clone(),
            user_id: user.clone(),
            skill_id: skill.clone(),
            proficiency,
            confidence: Confidence::default(),
            last_assessed: now,
            last_updated: now,
        };
        self.user_skills.insert(id, record.clone());
        Ok(record)
    }

    fn put_user_skill(&mut self, record: UserSkill) -> Result<(), SkillError> {
        for other in self.user_skills.values() {
            check_user_skill_slot(other, &record)?;
        }
        self.user_skills.insert(record.id.clone(), record);
        Ok(())
    }

    fn append_assessment(
        &mut self,
        mut result: AssessmentResult,
    ) -> Result<AssessmentResult, SkillError> {
        let id = match result.id.take() {
            Some(id) if self.assessments.contains_key(&id) => {
                return Err(assessment_logged(&id));
            }
            Some(id) => id,
            None => self.allocate_id(ASSESSMENTS_COLLECTION)?,
        };
        result.id = Some(id.clone());
        self.assessments.insert(id, result.clone());
        Ok(result)
    }

    fn assessments(&self, user: &UserId) -> Result<Vec<AssessmentResult>, SkillError> {
        let mut results: Vec<_> = self
            .assessments
            .values()
            .filter(|result| &result.user_id == user)
            .cloned()
            .collect();
        sort_assessments(&mut results);
        Ok(results)
    }

    fn all_assessments(&self) -> Result<Vec<AssessmentResult>, SkillError> {
        let mut results: Vec<_> = self.assessments.values().cloned().collect();
        sort_assessments(&mut results);
        Ok(results)
    }

    fn allocate_id(&mut self, collection: &'static str) -> Result<RecordId, SkillError> {
        let mut next = self.counters.get(collection).copied().unwrap_or(0);
        loop {
            next = next.saturating_add(1);
            let candidate = next.to_string();
            if !self.id_taken(collection, &candidate) {
                self.counters.insert(collection, next);
                return RecordId::new(candidate);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
