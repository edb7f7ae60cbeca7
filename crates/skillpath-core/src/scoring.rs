//! # Assessment Scoring
//!
//! Turns a set of proficiency records into a [`Scorecard`].
//!
//! - Overall score: mean proficiency, rounded half up
//! - Strengths: proficiency >= 80
//! - Weaknesses: proficiency < 60
//! - Recommendations: one per populated band pair, in fixed order
//!
//! All arithmetic is integer arithmetic. Input order is preserved in the
//! strengths and weaknesses lists.

use crate::primitives::MAX_PROFICIENCY;
use crate::{AssessmentResult, Proficiency, RecordId, SkillError, SkillId, UserId, UserSkill};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// RECOMMENDATIONS
// =============================================================================

/// Advice derived from which proficiency bands are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    /// Something sits in band 0 or 20.
    FocusOnFundamentals,
    /// Something sits in band 40 or 60.
    PracticeAdvancedTopics,
    /// Something sits in band 80 or 100.
    ConsiderMentoring,
}

impl Recommendation {
    /// Every recommendation, in output order.
    pub const ALL: [Recommendation; 3] = [
        Recommendation::FocusOnFundamentals,
        Recommendation::PracticeAdvancedTopics,
        Recommendation::ConsiderMentoring,
    ];

    /// Display text.
    #[must_use]
    pub fn text(&self) -> &'static str {
        match self {
            Recommendation::FocusOnFundamentals => "Focus on fundamental concepts",
            Recommendation::PracticeAdvancedTopics => "Practice more advanced topics",
            Recommendation::ConsiderMentoring => "Consider mentoring others",
        }
    }

    /// The bands that trigger this recommendation.
    #[must_use]
    pub fn bands(&self) -> [u8; 2] {
        match self {
            Recommendation::FocusOnFundamentals => [0, 20],
            Recommendation::PracticeAdvancedTopics => [40, 60],
            Recommendation::ConsiderMentoring => [80, 100],
        }
    }
}

// =============================================================================
// BAND DISTRIBUTION
// =============================================================================

/// Count of records per 20-point band, keyed by the band's lower bound.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BandDistribution(BTreeMap<u8, usize>);

impl BandDistribution {
    /// Bucket the given proficiencies.
    pub fn from_proficiencies(values: impl IntoIterator<Item = Proficiency>) -> Self {
        let mut bands = BTreeMap::new();
        for value in values {
            let count: &mut usize = bands.entry(value.band()).or_default();
            *count = count.saturating_add(1);
        }
        Self(bands)
    }

    /// Number of records in the band starting at `band`.
    #[must_use]
    pub fn count(&self, band: u8) -> usize {
        self.0.get(&band).copied().unwrap_or(0)
    }

    /// Whether any record falls in the band starting at `band`.
    #[must_use]
    pub fn is_populated(&self, band: u8) -> bool {
        self.count(band) > 0
    }

    /// Populated bands in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.0.iter().map(|(band, count)| (*band, *count))
    }

    /// Recommendations implied by this distribution, in fixed order.
    #[must_use]
    pub fn recommendations(&self) -> Vec<Recommendation> {
        Recommendation::ALL
            .into_iter()
            .filter(|rec| rec.bands().iter().any(|band| self.is_populated(*band)))
            .collect()
    }
}

// =============================================================================
// SCORECARD
// =============================================================================

/// The computed part of an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorecard {
    pub overall_score: u8,
    pub strengths: Vec<SkillId>,
    pub weaknesses: Vec<SkillId>,
    pub recommendations: Vec<Recommendation>,
    pub distribution: BandDistribution,
}

impl Scorecard {
    /// Attach identity and provenance to produce an [`AssessmentResult`].
    #[must_use]
    pub fn into_result(
        self,
        id: Option<RecordId>,
        user_id: UserId,
        skills: Vec<UserSkill>,
        assessed_at: DateTime<Utc>,
    ) -> AssessmentResult {
        AssessmentResult {
            id,
            user_id,
            skills,
            strengths: self.strengths,
            weaknesses: self.weaknesses,
            recommendations: self
                .recommendations
                .iter()
                .map(|rec| rec.text().to_string())
                .collect(),
            overall_score: self.overall_score,
            assessed_at,
        }
    }
}

/// Mean of the given proficiencies rounded half up, or `None` if empty.
#[must_use]
pub fn rounded_mean(values: impl IntoIterator<Item = Proficiency>) -> Option<u8> {
    let (sum, count) = values.into_iter().fold((0u64, 0u64), |(sum, count), p| {
        (sum.saturating_add(p.value() as u64), count.saturating_add(1))
    });
    if count == 0 {
        return None;
    }
    // round(sum / count) == floor((2 * sum + count) / (2 * count))
    let rounded = sum
        .saturating_mul(2)
        .saturating_add(count)
        .checked_div(count.saturating_mul(2))?;
    Some(u8::try_from(rounded).unwrap_or(MAX_PROFICIENCY))
}

/// Score a non-empty set of proficiency records.
///
/// Returns `SkillError::NoMatchingRecords` for an empty slice.
pub fn score(records: &[UserSkill]) -> Result<Scorecard, SkillError> {
    let overall_score = rounded_mean(records.iter().map(|r| r.proficiency))
        .ok_or(SkillError::NoMatchingRecords)?;

    let strengths = records
        .iter()
        .filter(|r| r.proficiency.is_strength())
        .map(|r| r.skill_id.clone())
        .collect();
    let weaknesses = records
        .iter()
        .filter(|r| r.proficiency.is_weakness())
        .map(|r| r.skill_id.clone())
        .collect();

    let distribution = BandDistribution::from_proficiencies(records.iter().map(|r| r.proficiency));
    let recommendations = distribution.recommendations();

    Ok(Scorecard {
        overall_score,
        strengths,
        weaknesses,
        recommendations,
        distribution,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Confidence;

    fn record(skill: &str, proficiency: i64) -> UserSkill {
        let now = Utc::now();
        UserSkill {
            id: RecordId::new(format!("r-{skill}")).expect("id"),
            user_id: UserId::new("1").expect("id"),
            skill_id: SkillId::new(skill).expect("id"),
            proficiency: Proficiency::new(proficiency).expect("proficiency"),
            confidence: Confidence::default(),
            last_assessed: now,
            last_updated: now,
        }
    }

    fn ids(ids: &[SkillId]) -> Vec<&str> {
        ids.iter().map(SkillId::as_str).collect()
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(score(&[]), Err(SkillError::NoMatchingRecords));
    }

    #[test]
    fn single_record_scores_itself() {
        let card = score(&[record("1", 42)]).expect("score");
        assert_eq!(card.overall_score, 42);
        assert_eq!(ids(&card.weaknesses), vec!["1"]);
        assert!(card.strengths.is_empty());
        assert_eq!(card.recommendations, vec![Recommendation::PracticeAdvancedTopics]);
    }

    #[test]
    fn mean_rounds_half_up() {
        // 85 + 74 = 159 -> 79.5 -> 80
        let card = score(&[record("1", 85), record("2", 74)]).expect("score");
        assert_eq!(card.overall_score, 80);
        // 10 + 11 + 11 = 32 -> 10.67 -> 11
        let card = score(&[record("1", 10), record("2", 11), record("3", 11)]).expect("score");
        assert_eq!(card.overall_score, 11);
    }

    #[test]
    fn threshold_boundaries() {
        let card = score(&[record("a", 80), record("b", 60), record("c", 59)]).expect("score");
        assert_eq!(ids(&card.strengths), vec!["a"]);
        assert_eq!(ids(&card.weaknesses), vec!["c"]);
    }

    #[test]
    fn all_three_recommendations_in_fixed_order() {
        let card = score(&[record("3", 90), record("1", 10), record("2", 50)]).expect("score");
        let texts: Vec<_> = card.recommendations.iter().map(|r| r.text()).collect();
        assert_eq!(
            texts,
            vec![
                "Focus on fundamental concepts",
                "Practice more advanced topics",
                "Consider mentoring others",
            ]
        );
    }

    #[test]
    fn seed_profile_example() {
        let card = score(&[record("1", 85), record("2", 75), record("3", 65)]).expect("score");
        assert_eq!(card.overall_score, 75);
        assert_eq!(ids(&card.strengths), vec!["1"]);
        assert!(card.weaknesses.is_empty());
        assert_eq!(
            card.recommendations,
            vec![
                Recommendation::PracticeAdvancedTopics,
                Recommendation::ConsiderMentoring
            ]
        );
        assert_eq!(card.distribution.count(60), 2);
        assert_eq!(card.distribution.count(80), 1);
    }

    #[test]
    fn perfect_score_lands_in_band_100() {
        let card = score(&[record("1", 100)]).expect("score");
        assert!(card.distribution.is_populated(100));
        assert_eq!(card.recommendations, vec![Recommendation::ConsiderMentoring]);
    }

    #[test]
    fn into_result_renders_recommendation_text() {
        let skills = vec![record("1", 15)];
        let card = score(&skills).expect("score");
        let result = card.into_result(None, UserId::new("1").expect("id"), skills, Utc::now());
        assert_eq!(result.recommendations, vec!["Focus on fundamental concepts"]);
        assert!(!result.is_persisted());
    }
}
