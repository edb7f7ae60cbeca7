//! # skillpath-core
//!
//! Skill catalog, proficiency records and assessment scoring for SkillPath.
//!
//! This crate owns the data model and every rule that touches it:
//! - `catalog`: read-only skill definitions and categories
//! - `proficiency`: one record per (user, skill) pair, created on first update
//! - `scoring`: rounded mean, strength/weakness thresholds, band recommendations
//! - `assessment`: request validation, scoring and the assessment log
//! - `session`: per-user volatile context and degradation on store failures
//! - `snapshot`: seed data, JSON import and export
//!
//! ## Architectural Constraints
//!
//! - Synchronous, no network dependencies
//! - Deterministic: `BTreeMap` collections, integer-only scoring
//! - Every operation takes its `SkillStore` explicitly

// =============================================================================
// MODULES
// =============================================================================

pub mod assessment;
pub mod catalog;
pub mod primitives;
pub mod proficiency;
pub mod scoring;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AssessmentResult, CategoryId, Confidence, ErrorKind, Proficiency, ProficiencyLevel, RecordId,
    Skill, SkillCategory, SkillError, SkillId, UserId, UserSkill,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use assessment::{AssessmentEngine, AssessmentRequest};
pub use catalog::{Catalog, fetch_skill_categories, fetch_skills};
pub use proficiency::{ProficiencyUpdate, get_user_skills, update_proficiency};
pub use scoring::{BandDistribution, Recommendation, Scorecard, rounded_mean, score};
pub use session::{Outcome, Session, StorageBackend, UserContext};
pub use snapshot::{ImportReport, Snapshot, export_snapshot, import_snapshot};
pub use storage::{CollectionCounts, MemoryStore, RedbStore, SkillStore};
