//! # Primitives
//!
//! Fixed constants for scoring, validation and storage.
//!
//! These values are compiled into the binary and are immutable at runtime.

/// Highest valid proficiency value.
pub const MAX_PROFICIENCY: u8 = 100;

/// Proficiency at or above which a skill counts as a strength.
pub const STRENGTH_THRESHOLD: u8 = 80;

/// Proficiency below which a skill counts as a weakness.
pub const WEAKNESS_THRESHOLD: u8 = 60;

/// Width of a proficiency band.
///
/// Bands start at 0: `0, 20, 40, 60, 80, 100`. A proficiency of exactly 100
/// lands in its own band.
pub const BAND_WIDTH: u8 = 20;

/// Confidence assigned to a record created by a proficiency update, and to
/// imported documents that carry no confidence.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for any identifier (user, skill, record).
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum number of skill ids accepted by a single assessment.
pub const MAX_ASSESSMENT_SKILLS: usize = 500;

// =============================================================================
// COLLECTION NAMES
// =============================================================================

/// Skill definitions.
pub const SKILLS_COLLECTION: &str = "skills";

/// Skill category metadata.
pub const CATEGORIES_COLLECTION: &str = "skillCategories";

/// Per-user proficiency records.
pub const USER_SKILLS_COLLECTION: &str = "userSkills";

/// Append-only log of assessment results.
pub const ASSESSMENTS_COLLECTION: &str = "assessments";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_leave_a_neutral_band() {
        assert_eq!(STRENGTH_THRESHOLD - WEAKNESS_THRESHOLD, BAND_WIDTH);
        assert_eq!(MAX_PROFICIENCY % BAND_WIDTH, 0);
    }
}
