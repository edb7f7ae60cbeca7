//! # Assessment Engine
//!
//! Computes and records an assessment over a chosen subset of a user's skills.
//!
//! ```text
//! AssessmentRequest ──► prepare ──► persist ──► AssessmentResult (id = Some)
//!                        │  fetch the user's records
//!                        │  keep the requested skills
//!                        └─ score
//! ```
//!
//! `prepare` and `persist` are separate so a caller that loses the store
//! after scoring still holds a computed result. Fallback results are built
//! explicitly with [`AssessmentEngine::from_cache`] or
//! [`AssessmentEngine::placeholder`]; the engine never substitutes one on its
//! own.

use crate::primitives::MAX_ASSESSMENT_SKILLS;
use crate::scoring::score;
use crate::storage::SkillStore;
use crate::{AssessmentResult, SkillError, SkillId, UserId, UserSkill};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Overall score of the placeholder result.
pub const PLACEHOLDER_SCORE: u8 = 75;

/// Strengths reported by the placeholder result.
pub const PLACEHOLDER_STRENGTHS: [&str; 2] = ["JavaScript", "React"];

/// Weaknesses reported by the placeholder result.
pub const PLACEHOLDER_WEAKNESSES: [&str; 2] = ["Node.js", "TypeScript"];

/// Recommendations reported by the placeholder result.
pub const PLACEHOLDER_RECOMMENDATIONS: [&str; 2] =
    ["Take advanced JavaScript course", "Start learning TypeScript"];

/// A validated assessment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentRequest {
    pub user_id: UserId,
    /// Requested skills, duplicates removed, first occurrence kept.
    pub skill_ids: Vec<SkillId>,
}

impl AssessmentRequest {
    /// Validate raw input.
    ///
    /// # Errors
    ///
    /// - `SkillError::MissingIdentifier` if the user id or any skill id is blank
    /// - `SkillError::EmptySelection` if no skill ids are given
    /// - `SkillError::InvalidRecord` if more than `MAX_ASSESSMENT_SKILLS` are given
    pub fn parse<I, T>(user_id: &str, skill_ids: I) -> Result<Self, SkillError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let user_id = UserId::new(user_id)?;
        let mut seen = BTreeSet::new();
        let mut ids = Vec::new();
        for raw in skill_ids {
            let id = SkillId::new(raw.as_ref())?;
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
        Self::new(user_id, ids)
    }

    /// Build from typed ids.
    pub fn new(user_id: UserId, skill_ids: Vec<SkillId>) -> Result<Self, SkillError> {
        if skill_ids.is_empty() {
            return Err(SkillError::EmptySelection);
        }
        if skill_ids.len() > MAX_ASSESSMENT_SKILLS {
            return Err(SkillError::InvalidRecord(format!(
                "{} skills requested, maximum is {}",
                skill_ids.len(),
                MAX_ASSESSMENT_SKILLS
            )));
        }
        Ok(Self { user_id, skill_ids })
    }

    /// Keep only the records for requested skills, in record order.
    #[must_use]
    pub fn select(&self, records: impl IntoIterator<Item = UserSkill>) -> Vec<UserSkill> {
        records
            .into_iter()
            .filter(|r| r.user_id == self.user_id && self.skill_ids.contains(&r.skill_id))
            .collect()
    }
}

/// Assessment computation and recording.
pub struct AssessmentEngine;

impl AssessmentEngine {
    /// Fetch the user's records, keep the requested ones and score them.
    ///
    /// The returned result has no id.
    pub fn prepare<S: SkillStore + ?Sized>(
        store: &S,
        request: &AssessmentRequest,
        now: DateTime<Utc>,
    ) -> Result<AssessmentResult, SkillError> {
        let records = request.select(store.user_skills(&request.user_id)?);
        Self::score_records(request, records, now)
    }

    /// Append a prepared result to the `assessments` log.
    pub fn persist<S: SkillStore + ?Sized>(
        store: &mut S,
        result: AssessmentResult,
    ) -> Result<AssessmentResult, SkillError> {
        let stored = store.append_assessment(result)?;
        tracing::info!(
            user = %stored.user_id,
            id = ?stored.id.as_ref().map(|id| id.to_string()),
            score = stored.overall_score,
            skills = stored.skills.len(),
            "assessment recorded"
        );
        Ok(stored)
    }

    /// Prepare and persist in one step.
    pub fn assess<S: SkillStore + ?Sized>(
        store: &mut S,
        request: &AssessmentRequest,
        now: DateTime<Utc>,
    ) -> Result<AssessmentResult, SkillError> {
        let prepared = Self::prepare(store, request, now)?;
        Self::persist(store, prepared)
    }

    /// Score locally held records without touching a store.
    ///
    /// Returns `SkillError::NoMatchingRecords` if none of the requested
    /// skills are among `cached`.
    pub fn from_cache(
        request: &AssessmentRequest,
        cached: impl IntoIterator<Item = UserSkill>,
        now: DateTime<Utc>,
    ) -> Result<AssessmentResult, SkillError> {
        Self::score_records(request, request.select(cached), now)
    }

    /// The fixed placeholder result, used when nothing can be scored.
    ///
    /// `skills` is whatever the caller still holds for the request.
    #[must_use]
    pub fn placeholder(
        request: &AssessmentRequest,
        skills: Vec<UserSkill>,
        now: DateTime<Utc>,
    ) -> AssessmentResult {
        let ids = |names: &[&str]| -> Vec<SkillId> {
            names
                .iter()
                .filter_map(|name| SkillId::new(*name).ok())
                .collect()
        };
        AssessmentResult {
            id: None,
            user_id: request.user_id.clone(),
            skills,
            strengths: ids(&PLACEHOLDER_STRENGTHS),
            weaknesses: ids(&PLACEHOLDER_WEAKNESSES),
            recommendations: PLACEHOLDER_RECOMMENDATIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            overall_score: PLACEHOLDER_SCORE,
            assessed_at: now,
        }
    }

    fn score_records(
        request: &AssessmentRequest,
        records: Vec<UserSkill>,
        now: DateTime<Utc>,
    ) -> Result<AssessmentResult, SkillError> {
        let scorecard = score(&records)?;
        Ok(scorecard.into_result(None, request.user_id.clone(), records, now))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proficiency::{ProficiencyUpdate, update_proficiency};
    use crate::storage::MemoryStore;

    fn store_with(user: &str, entries: &[(&str, i64)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (skill, value) in entries {
            let update = ProficiencyUpdate::parse(user, skill, *value).expect("parse");
            update_proficiency(&mut store, &update, Utc::now()).expect("update");
        }
        store
    }

    #[test]
    fn parse_rejects_empty_selection() {
        let empty: [&str; 0] = [];
        assert_eq!(
            AssessmentRequest::parse("1", empty),
            Err(SkillError::EmptySelection)
        );
    }

    #[test]
    fn parse_requires_user() {
        assert_eq!(
            AssessmentRequest::parse("", ["1"]),
            Err(SkillError::MissingIdentifier("user id"))
        );
    }

    #[test]
    fn parse_dedupes_in_order() {
        let request = AssessmentRequest::parse("1", ["3", "1", "3"]).expect("parse");
        let ids: Vec<_> = request.skill_ids.iter().map(SkillId::as_str).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn assess_filters_scores_and_persists() {
        let mut store = store_with("1", &[("1", 85), ("2", 75), ("3", 65), ("4", 10)]);
        let request = AssessmentRequest::parse("1", ["1", "2", "3"]).expect("parse");

        let result = AssessmentEngine::assess(&mut store, &request, Utc::now()).expect("assess");

        assert!(result.is_persisted());
        assert_eq!(result.overall_score, 75);
        assert_eq!(result.skills.len(), 3);
        assert_eq!(
            result.strengths,
            vec![SkillId::new("1").expect("id")]
        );
        assert!(result.weaknesses.is_empty());
        assert_eq!(
            result.recommendations,
            vec!["Practice more advanced topics", "Consider mentoring others"]
        );
        assert_eq!(store.assessments(&request.user_id).expect("log").len(), 1);
    }

    #[test]
    fn assess_without_records_is_a_validation_error() {
        let mut store = store_with("1", &[("1", 85)]);
        let request = AssessmentRequest::parse("1", ["9"]).expect("parse");

        let err = AssessmentEngine::assess(&mut store, &request, Utc::now()).expect_err("fails");
        assert_eq!(err, SkillError::NoMatchingRecords);
        assert!(err.is_validation());
        assert_eq!(store.all_assessments().expect("log").len(), 0);
    }

    #[test]
    fn other_users_records_are_ignored() {
        let mut store = store_with("2", &[("1", 10)]);
        let request = AssessmentRequest::parse("1", ["1"]).expect("parse");
        assert_eq!(
            AssessmentEngine::assess(&mut store, &request, Utc::now()),
            Err(SkillError::NoMatchingRecords)
        );
    }

    #[test]
    fn placeholder_is_fixed() {
        let request = AssessmentRequest::parse("7", ["1"]).expect("parse");
        let result = AssessmentEngine::placeholder(&request, Vec::new(), Utc::now());
        assert_eq!(result.overall_score, PLACEHOLDER_SCORE);
        assert_eq!(result.strengths.len(), 2);
        assert_eq!(result.user_id.as_str(), "7");
        assert!(!result.is_persisted());
    }
}
