//! # Snapshots
//!
//! JSON-friendly interchange of all four collections, used for seeding,
//! import and export.
//!
//! Imported documents are loosely typed, the way a document store hands
//! them out:
//! - a missing `id` gets a store-assigned one
//! - missing `proficiencyLevels`, `relatedSkills`, `skills` become empty lists
//! - a missing `confidence` becomes 0.8
//! - missing timestamps become the import time
//!
//! Every document is validated, and checked against the store's existing
//! records, before anything is written, so a bad snapshot is rejected as a
//! whole.

use crate::primitives::{CATEGORIES_COLLECTION, SKILLS_COLLECTION, USER_SKILLS_COLLECTION};
use crate::storage::SkillStore;
use crate::{
    AssessmentResult, CategoryId, Confidence, Proficiency, ProficiencyLevel, RecordId, Skill,
    SkillCategory, SkillError, SkillId, UserId, UserSkill,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// DOCUMENT SHAPES
// =============================================================================

/// A `skills` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDocument {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub proficiency_levels: Vec<ProficiencyLevel>,
    #[serde(default)]
    pub related_skills: Vec<String>,
}

/// A `skillCategories` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDocument {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

/// A `userSkills` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSkillDocument {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    pub skill_id: String,
    pub proficiency: i64,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub last_assessed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl From<Skill> for SkillDocument {
    fn from(skill: Skill) -> Self {
        Self {
            id: Some(skill.id.into()),
            name: skill.name,
            category: skill.category,
            description: skill.description,
            proficiency_levels: skill.proficiency_levels,
            related_skills: skill.related_skills,
        }
    }
}

impl From<SkillCategory> for CategoryDocument {
    fn from(category: SkillCategory) -> Self {
        Self {
            id: Some(category.id.into()),
            name: category.name,
            description: category.description,
            skills: category.skills,
        }
    }
}

impl From<UserSkill> for UserSkillDocument {
    fn from(record: UserSkill) -> Self {
        Self {
            id: Some(record.id.into()),
            user_id: record.user_id.into(),
            skill_id: record.skill_id.into(),
            proficiency: i64::from(record.proficiency.value()),
            confidence: Some(record.confidence.value()),
            last_assessed: Some(record.last_assessed),
            last_updated: Some(record.last_updated),
        }
    }
}

/// All four collections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub skills: Vec<SkillDocument>,
    #[serde(default)]
    pub skill_categories: Vec<CategoryDocument>,
    #[serde(default)]
    pub user_skills: Vec<UserSkillDocument>,
    #[serde(default)]
    pub assessments: Vec<AssessmentResult>,
}

/// Documents written by an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub skills: usize,
    pub skill_categories: usize,
    pub user_skills: usize,
    pub assessments: usize,
}

// =============================================================================
// IMPORT / EXPORT
// =============================================================================

fn optional_id<T>(
    raw: Option<&String>,
    make: impl Fn(String) -> Result<T, SkillError>,
) -> Result<Option<T>, SkillError> {
    raw.map(|id| make(id.clone())).transpose()
}

/// A validated `userSkills` document, id still optional.
type PendingUserSkill = (
    Option<RecordId>,
    UserId,
    SkillId,
    Proficiency,
    Confidence,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// Reject proficiency records that would duplicate a (user, skill) pair or
/// take over the id of another pair's record, within the snapshot or
/// against the store.
fn check_user_skill_slots<S: SkillStore + ?Sized>(
    store: &S,
    pending: &[PendingUserSkill],
) -> Result<(), SkillError> {
    let mut owners: BTreeMap<(UserId, SkillId), RecordId> = BTreeMap::new();
    let mut holders: BTreeMap<RecordId, (UserId, SkillId)> = BTreeMap::new();
    for record in store.all_user_skills()? {
        let pair = (record.user_id, record.skill_id);
        owners.insert(pair.clone(), record.id.clone());
        holders.insert(record.id, pair);
    }

    let mut pairs = BTreeSet::new();
    let mut ids = BTreeSet::new();
    for (id, user, skill, ..) in pending {
        let pair = (user.clone(), skill.clone());
        let duplicate_pair = || {
            SkillError::InvalidRecord(format!("user {user} already has a record for skill {skill}"))
        };
        if !pairs.insert(pair.clone()) {
            return Err(duplicate_pair());
        }
        if let Some(id) = id {
            if !ids.insert(id.clone()) {
                return Err(SkillError::InvalidRecord(format!(
                    "record {id} appears more than once"
                )));
            }
            if let Some((owner, owned)) = holders.get(id).filter(|held| **held != pair) {
                return Err(SkillError::InvalidRecord(format!(
                    "record {id} belongs to user {owner} skill {owned}"
                )));
            }
        }
        if owners.get(&pair).is_some_and(|owner| Some(owner) != id.as_ref()) {
            return Err(duplicate_pair());
        }
    }
    Ok(())
}

/// Drop results already in the log verbatim; reject any that would rewrite
/// a logged result or repeat an id.
fn unlogged_assessments<S: SkillStore + ?Sized>(
    store: &S,
    results: Vec<AssessmentResult>,
) -> Result<Vec<AssessmentResult>, SkillError> {
    let logged: BTreeMap<RecordId, AssessmentResult> = store
        .all_assessments()?
        .into_iter()
        .filter_map(|result| result.id.clone().map(|id| (id, result)))
        .collect();

    let mut ids = BTreeSet::new();
    let mut fresh = Vec::with_capacity(results.len());
    for result in results {
        if let Some(id) = &result.id {
            if !ids.insert(id.clone()) {
                return Err(SkillError::InvalidRecord(format!(
                    "assessment {id} appears more than once"
                )));
            }
            match logged.get(id) {
                Some(existing) if *existing == result => continue,
                Some(_) => {
                    return Err(SkillError::InvalidRecord(format!(
                        "assessment {id} is already logged"
                    )));
                }
                None => {}
            }
        }
        fresh.push(result);
    }
    Ok(fresh)
}

/// Write every document of `snapshot` into `store`.
///
/// Nothing is written unless every document is valid and fits the store:
/// one record per (user, skill) pair, record ids never reassigned to
/// another pair, logged assessments never rewritten.
pub fn import_snapshot<S: SkillStore + ?Sized>(
    store: &mut S,
    snapshot: Snapshot,
    now: DateTime<Utc>,
) -> Result<ImportReport, SkillError> {
    // Pass 1: validate everything before touching the store.
    let mut skills = Vec::with_capacity(snapshot.skills.len());
    for doc in snapshot.skills {
        let id = optional_id(doc.id.as_ref(), SkillId::new)?;
        // Validated under a provisional id; the real one is assigned on write.
        let skill = Skill {
            id: id.clone().map_or_else(|| SkillId::new("pending"), Ok)?,
            name: doc.name,
            category: doc.category,
            description: doc.description,
            proficiency_levels: doc.proficiency_levels,
            related_skills: doc.related_skills,
        };
        skill.validate()?;
        skills.push((id, skill));
    }

    let mut categories = Vec::with_capacity(snapshot.skill_categories.len());
    for doc in snapshot.skill_categories {
        let id = optional_id(doc.id.as_ref(), CategoryId::new)?;
        categories.push((id, doc.name, doc.description, doc.skills));
    }

    let mut user_skills: Vec<PendingUserSkill> = Vec::with_capacity(snapshot.user_skills.len());
    for doc in snapshot.user_skills {
        let id = optional_id(doc.id.as_ref(), RecordId::new)?;
        let confidence = match doc.confidence {
            Some(value) => Confidence::new(value)?,
            None => Confidence::default(),
        };
        user_skills.push((
            id,
            UserId::new(doc.user_id)?,
            SkillId::new(doc.skill_id)?,
            Proficiency::new(doc.proficiency)?,
            confidence,
            doc.last_assessed.unwrap_or(now),
            doc.last_updated.unwrap_or(now),
        ));
    }

    check_user_skill_slots(store, &user_skills)?;
    let mut assessments = unlogged_assessments(store, snapshot.assessments)?;

    // Pass 2: write documents with explicit ids first so allocated ids
    // never land on one of them, then assign the rest.
    skills.sort_by_key(|(id, _)| id.is_none());
    categories.sort_by_key(|(id, ..)| id.is_none());
    user_skills.sort_by_key(|(id, ..)| id.is_none());
    assessments.sort_by_key(|result| result.id.is_none());
    let mut report = ImportReport::default();

    for (id, mut skill) in skills {
        skill.id = match id {
            Some(id) => id,
            None => SkillId::new(store.allocate_id(SKILLS_COLLECTION)?)?,
        };
        store.put_skill(skill)?;
        report.skills += 1;
    }

    for (id, name, description, members) in categories {
        let id = match id {
            Some(id) => id,
            None => CategoryId::new(store.allocate_id(CATEGORIES_COLLECTION)?)?,
        };
        store.put_category(SkillCategory {
            id,
            name,
            description,
            skills: members,
        })?;
        report.skill_categories += 1;
    }

    for (id, user_id, skill_id, proficiency, confidence, last_assessed, last_updated) in
        user_skills
    {
        let id = match id {
            Some(id) => id,
            None => store.allocate_id(USER_SKILLS_COLLECTION)?,
        };
        store.put_user_skill(UserSkill {
            id,
            user_id,
            skill_id,
            proficiency,
            confidence,
            last_assessed,
            last_updated,
        })?;
        report.user_skills += 1;
    }

    for result in assessments {
        store.append_assessment(result)?;
        report.assessments += 1;
    }

    tracing::info!(
        skills = report.skills,
        categories = report.skill_categories,
        user_skills = report.user_skills,
        assessments = report.assessments,
        "snapshot imported"
    );
    Ok(report)
}

/// Read every collection into a snapshot.
pub fn export_snapshot<S: SkillStore + ?Sized>(store: &S) -> Result<Snapshot, SkillError> {
    Ok(Snapshot {
        skills: store.skills()?.into_iter().map(Into::into).collect(),
        skill_categories: store.categories()?.into_iter().map(Into::into).collect(),
        user_skills: store.all_user_skills()?.into_iter().map(Into::into).collect(),
        assessments: store.all_assessments()?,
    })
}

// =============================================================================
// SEED DATA
// =============================================================================

fn level(level: u32, name: &str, description: &str, criteria: [&str; 2]) -> ProficiencyLevel {
    ProficiencyLevel {
        level,
        name: name.to_string(),
        description: description.to_string(),
        criteria: criteria.iter().map(|c| (*c).to_string()).collect(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Snapshot {
    /// The sample dataset: three skills, three categories and a profile for
    /// user `1` (JavaScript 85, React 75, Node.js 65).
    #[must_use]
    pub fn seed() -> Self {
        let seeded_at = Utc
            .with_ymd_and_hms(2025, 5, 18, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let skills = vec![
            SkillDocument {
                id: Some("1".into()),
                name: "JavaScript".into(),
                category: "Programming Languages".into(),
                description: "A programming language that is commonly used to create interactive effects within web browsers.".into(),
                proficiency_levels: vec![
                    level(1, "Beginner", "Basic understanding of JavaScript syntax", ["Can write simple functions", "Understands variables and control structures"]),
                    level(2, "Intermediate", "Can create complex applications", ["Can use ES6+", "Understands async operations"]),
                    level(3, "Advanced", "Expert level knowledge", ["Can write complex algorithms", "Understands performance optimization"]),
                ],
                related_skills: strings(&["React", "Node.js", "TypeScript"]),
            },
            SkillDocument {
                id: Some("2".into()),
                name: "React".into(),
                category: "Frontend Frameworks".into(),
                description: "A JavaScript library for building user interfaces.".into(),
                proficiency_levels: vec![
                    level(1, "Beginner", "Basic understanding of React concepts", ["Can create simple components", "Understands JSX"]),
                    level(2, "Intermediate", "Can build complex applications", ["Understands hooks", "Can use context"]),
                    level(3, "Advanced", "Expert level knowledge", ["Can optimize performance", "Understands advanced patterns"]),
                ],
                related_skills: strings(&["JavaScript", "TypeScript", "Redux"]),
            },
            SkillDocument {
                id: Some("3".into()),
                name: "Node.js".into(),
                category: "Backend Technologies".into(),
                description: "An open-source, cross-platform JavaScript runtime environment.".into(),
                proficiency_levels: vec![
                    level(1, "Beginner", "Basic understanding of Node.js", ["Can write simple scripts", "Understands npm"]),
                    level(2, "Intermediate", "Can build complex applications", ["Can use async/await", "Understands streams"]),
                    level(3, "Advanced", "Expert level knowledge", ["Can optimize performance", "Understands clustering"]),
                ],
                related_skills: strings(&["JavaScript", "Express", "MongoDB"]),
            },
        ];

        let skill_categories = vec![
            CategoryDocument {
                id: Some("1".into()),
                name: "Programming Languages".into(),
                description: "Programming languages and their related technologies".into(),
                skills: strings(&["JavaScript", "TypeScript", "Python", "Java"]),
            },
            CategoryDocument {
                id: Some("2".into()),
                name: "Frontend Frameworks".into(),
                description: "Frontend development frameworks and libraries".into(),
                skills: strings(&["React", "Vue.js", "Angular"]),
            },
            CategoryDocument {
                id: Some("3".into()),
                name: "Backend Technologies".into(),
                description: "Backend development technologies and frameworks".into(),
                skills: strings(&["Node.js", "Express", "Django"]),
            },
        ];

        let profile = |skill_id: &str, proficiency: i64, confidence: f64| UserSkillDocument {
            id: None,
            user_id: "1".into(),
            skill_id: skill_id.into(),
            proficiency,
            confidence: Some(confidence),
            last_assessed: Some(seeded_at),
            last_updated: Some(seeded_at),
        };

        Self {
            skills,
            skill_categories,
            user_skills: vec![profile("1", 85, 0.9), profile("2", 75, 0.8), profile("3", 65, 0.7)],
            assessments: Vec::new(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
