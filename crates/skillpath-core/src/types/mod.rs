//! # Core Type Definitions
//!
//! This module contains the data model shared by every SkillPath component:
//! - Identifiers (`UserId`, `SkillId`, `CategoryId`, `RecordId`)
//! - Validated scalars (`Proficiency`, `Confidence`)
//! - Reference data (`Skill`, `ProficiencyLevel`, `SkillCategory`)
//! - Per-user records (`UserSkill`, `AssessmentResult`)
//! - Error types (`SkillError`, `ErrorKind`)
//!
//! ## Validation Guarantees
//!
//! Identifiers and scalars validate on construction AND on deserialization,
//! so a value of one of these types is always in range.

use crate::primitives::{
    DEFAULT_CONFIDENCE, MAX_ID_LENGTH, MAX_PROFICIENCY, STRENGTH_THRESHOLD, WEAKNESS_THRESHOLD,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a ", $label, ", rejecting empty or oversized input.")]
            pub fn new(id: impl Into<String>) -> Result<Self, SkillError> {
                let id = id.into();
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    return Err(SkillError::MissingIdentifier($label));
                }
                if trimmed.len() > MAX_ID_LENGTH {
                    return Err(SkillError::InvalidRecord(format!(
                        "{} length {} exceeds maximum {} bytes",
                        $label,
                        trimmed.len(),
                        MAX_ID_LENGTH
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            #[doc = concat!("Get the ", $label, " as a string slice.")]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = SkillError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Identifies the person whose skills are tracked. Threaded explicitly
    /// through every per-user operation.
    UserId,
    "user id"
);

identifier!(
    /// Identifies a skill definition in the `skills` collection.
    SkillId,
    "skill id"
);

identifier!(
    /// Identifies a document in the `skillCategories` collection.
    CategoryId,
    "category id"
);

identifier!(
    /// Store-assigned identifier of a `userSkills` or `assessments` document.
    RecordId,
    "record id"
);

// =============================================================================
// PROFICIENCY & CONFIDENCE
// =============================================================================

/// Skill mastery on an integer scale from 0 to 100 inclusive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Proficiency(u8);

impl Proficiency {
    /// Create a proficiency, rejecting values outside `0..=100`.
    pub fn new(value: i64) -> Result<Self, SkillError> {
        match u8::try_from(value) {
            Ok(v) if v <= MAX_PROFICIENCY => Ok(Self(v)),
            _ => Err(SkillError::ProficiencyOutOfRange(value)),
        }
    }

    /// Get the raw value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Lower bound of the 20-point band this value falls in.
    #[must_use]
    pub const fn band(self) -> u8 {
        (self.0 / crate::primitives::BAND_WIDTH) * crate::primitives::BAND_WIDTH
    }

    /// `true` for values of 80 and above.
    #[must_use]
    pub const fn is_strength(self) -> bool {
        self.0 >= STRENGTH_THRESHOLD
    }

    /// `true` for values below 60.
    #[must_use]
    pub const fn is_weakness(self) -> bool {
        self.0 < WEAKNESS_THRESHOLD
    }
}

impl TryFrom<u8> for Proficiency {
    type Error = SkillError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<Proficiency> for u8 {
    fn from(value: Proficiency) -> Self {
        value.0
    }
}

/// Self-reported certainty accompanying a proficiency, from 0.0 to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Create a confidence, rejecting NaN and values outside `0.0..=1.0`.
    pub fn new(value: f64) -> Result<Self, SkillError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SkillError::ConfidenceOutOfRange(value))
        }
    }

    /// Get the raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self(DEFAULT_CONFIDENCE)
    }
}

impl TryFrom<f64> for Confidence {
    type Error = SkillError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

// =============================================================================
// REFERENCE DATA
// =============================================================================

/// One rung of a skill's proficiency ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProficiencyLevel {
    /// Level number, starting at 1.
    pub level: u32,
    /// Display name ("Beginner", "Advanced", ...).
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Observable criteria for reaching this level.
    #[serde(default)]
    pub criteria: Vec<String>,
}

/// A skill definition. Immutable reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    /// Name of the category this skill belongs to.
    pub category: String,
    pub description: String,
    /// Ladder ordered by level number, without duplicates.
    pub proficiency_levels: Vec<ProficiencyLevel>,
    /// Names or ids of related skills.
    pub related_skills: Vec<String>,
}

impl Skill {
    /// Check the proficiency ladder: levels start at 1 or above and strictly
    /// increase.
    pub fn validate(&self) -> Result<(), SkillError> {
        let mut previous = 0;
        for level in &self.proficiency_levels {
            if level.level <= previous {
                return Err(SkillError::InvalidRecord(format!(
                    "skill {}: proficiency level {} is out of order or duplicated",
                    self.id, level.level
                )));
            }
            previous = level.level;
        }
        Ok(())
    }

    /// Find the ladder entry with the given level number.
    #[must_use]
    pub fn level(&self, level: u32) -> Option<&ProficiencyLevel> {
        self.proficiency_levels
            .binary_search_by_key(&level, |l| l.level)
            .ok()
            .map(|idx| &self.proficiency_levels[idx])
    }
}

/// A named group of skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    /// Member skill names or ids.
    pub skills: Vec<String>,
}

// =============================================================================
// PER-USER RECORDS
// =============================================================================

/// A user's proficiency in one skill. One record per (user, skill) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSkill {
    pub id: RecordId,
    pub user_id: UserId,
    pub skill_id: SkillId,
    pub proficiency: Proficiency,
    pub confidence: Confidence,
    pub last_assessed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Summary of an assessment over a subset of a user's skills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    /// `None` when the result was never persisted (fallback results).
    pub id: Option<RecordId>,
    pub user_id: UserId,
    /// The records the result was computed from.
    pub skills: Vec<UserSkill>,
    pub strengths: Vec<SkillId>,
    pub weaknesses: Vec<SkillId>,
    pub recommendations: Vec<String>,
    /// Rounded mean proficiency, 0 to 100.
    pub overall_score: u8,
    pub assessed_at: DateTime<Utc>,
}

impl AssessmentResult {
    /// Whether this result is stored in the `assessments` log.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Broad class of a [`SkillError`], used to decide how callers recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input. Raised immediately, never replaced by a fallback.
    Validation,
    /// The store failed or a document is missing.
    DataAccess,
    /// Anything uncategorized.
    Unknown,
}

/// Errors that can occur in SkillPath.
///
/// - No silent failures
/// - Use `Result<T, SkillError>` for fallible operations
/// - The core never panics; all errors are recoverable
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkillError {
    /// A proficiency value outside `0..=100`.
    #[error("Proficiency must be between 0 and 100, got {0}")]
    ProficiencyOutOfRange(i64),

    /// A confidence value outside `0.0..=1.0`.
    #[error("Confidence must be between 0.0 and 1.0, got {0}")]
    ConfidenceOutOfRange(f64),

    /// A required identifier was empty or absent.
    #[error("Missing required identifier: {0}")]
    MissingIdentifier(&'static str),

    /// An assessment was requested without any skill ids.
    #[error("No skills selected for assessment")]
    EmptySelection,

    /// None of the requested skills have a proficiency record.
    #[error("No user skills found for the selected skills")]
    NoMatchingRecords,

    /// A document or request field failed validation.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The requested document does not exist.
    #[error("Document not found: {collection}/{id}")]
    DocumentNotFound {
        collection: &'static str,
        id: String,
    },

    /// The store could not be reached or a transaction failed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Anything uncategorized.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SkillError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProficiencyOutOfRange(_)
            | Self::ConfidenceOutOfRange(_)
            | Self::MissingIdentifier(_)
            | Self::EmptySelection
            | Self::NoMatchingRecords
            | Self::InvalidRecord(_) => ErrorKind::Validation,
            Self::DocumentNotFound { .. }
            | Self::StoreUnavailable(_)
            | Self::SerializationError(_) => ErrorKind::DataAccess,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Stable machine-readable code for API responses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DocumentNotFound { .. } => "NOT_FOUND",
            _ => match self.kind() {
                ErrorKind::Validation => "VALIDATION_ERROR",
                ErrorKind::DataAccess => "DATA_ACCESS_ERROR",
                ErrorKind::Unknown => "UNKNOWN_ERROR",
            },
        }
    }

    /// `true` for validation errors.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proficiency_accepts_bounds() {
        assert_eq!(Proficiency::new(0).map(Proficiency::value), Ok(0));
        assert_eq!(Proficiency::new(100).map(Proficiency::value), Ok(100));
    }

    #[test]
    fn proficiency_rejects_out_of_range() {
        assert_eq!(
            Proficiency::new(101),
            Err(SkillError::ProficiencyOutOfRange(101))
        );
        assert_eq!(
            Proficiency::new(-1),
            Err(SkillError::ProficiencyOutOfRange(-1))
        );
    }

    #[test]
    fn proficiency_classification_boundaries() {
        let p = |v| Proficiency::new(v).expect("valid");
        assert!(p(80).is_strength());
        assert!(!p(79).is_strength());
        assert!(!p(60).is_strength() && !p(60).is_weakness());
        assert!(p(59).is_weakness());
    }

    #[test]
    fn proficiency_bands() {
        let p = |v| Proficiency::new(v).expect("valid");
        assert_eq!(p(0).band(), 0);
        assert_eq!(p(19).band(), 0);
        assert_eq!(p(20).band(), 20);
        assert_eq!(p(99).band(), 80);
        assert_eq!(p(100).band(), 100);
    }

    #[test]
    fn confidence_rejects_nan_and_out_of_range() {
        assert!(Confidence::new(f64::NAN).is_err());
        assert!(Confidence::new(1.5).is_err());
        assert!(Confidence::new(-0.1).is_err());
        assert!(Confidence::new(0.0).is_ok());
        assert!(Confidence::new(1.0).is_ok());
    }

    #[test]
    fn identifier_rejects_blank() {
        assert_eq!(
            UserId::new("   "),
            Err(SkillError::MissingIdentifier("user id"))
        );
        assert_eq!(SkillId::new(" 7 ").map(|id| id.to_string()), Ok("7".into()));
    }

    #[test]
    fn identifier_rejects_oversized() {
        let long = "x".repeat(MAX_ID_LENGTH + 1);
        assert!(matches!(
            RecordId::new(long),
            Err(SkillError::InvalidRecord(_))
        ));
    }

    #[test]
    fn skill_validate_detects_unordered_levels() {
        let level = |n| ProficiencyLevel {
            level: n,
            name: format!("L{n}"),
            description: String::new(),
            criteria: Vec::new(),
        };
        let mut skill = Skill {
            id: SkillId::new("1").expect("id"),
            name: "Rust".into(),
            category: "Programming Languages".into(),
            description: String::new(),
            proficiency_levels: vec![level(1), level(2), level(3)],
            related_skills: Vec::new(),
        };
        assert!(skill.validate().is_ok());
        assert_eq!(skill.level(2).map(|l| l.name.as_str()), Some("L2"));

        skill.proficiency_levels = vec![level(1), level(1)];
        assert!(skill.validate().is_err());

        skill.proficiency_levels = vec![level(0)];
        assert!(skill.validate().is_err());
    }

    #[test]
    fn error_taxonomy() {
        assert_eq!(SkillError::EmptySelection.kind(), ErrorKind::Validation);
        assert_eq!(
            SkillError::StoreUnavailable("down".into()).kind(),
            ErrorKind::DataAccess
        );
        assert_eq!(SkillError::Unknown("?".into()).code(), "UNKNOWN_ERROR");
        assert_eq!(
            SkillError::DocumentNotFound {
                collection: "skills",
                id: "9".into()
            }
            .code(),
            "NOT_FOUND"
        );
    }
}
