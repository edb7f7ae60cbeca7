//! # Skill Catalog
//!
//! Read-only access to skill definitions and category metadata.
//!
//! Retrieval is a full scan of the `skills` and `skillCategories`
//! collections: no filtering, pagination or caching here. The session
//! decides what to keep and how to degrade when the store is unreachable.

use crate::storage::SkillStore;
use crate::{CategoryId, Skill, SkillCategory, SkillError, SkillId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Skill definitions keyed by id.
pub type SkillMap = BTreeMap<SkillId, Skill>;

/// Category metadata keyed by id.
pub type CategoryMap = BTreeMap<CategoryId, SkillCategory>;

/// Fetch every skill definition.
pub fn fetch_skills<S: SkillStore + ?Sized>(store: &S) -> Result<Vec<Skill>, SkillError> {
    store.skills()
}

/// Fetch every skill category.
pub fn fetch_skill_categories<S: SkillStore + ?Sized>(
    store: &S,
) -> Result<Vec<SkillCategory>, SkillError> {
    store.categories()
}

/// A loaded snapshot of the reference data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    skills: SkillMap,
    categories: CategoryMap,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already-fetched documents.
    #[must_use]
    pub fn from_parts(skills: Vec<Skill>, categories: Vec<SkillCategory>) -> Self {
        Self {
            skills: skills.into_iter().map(|s| (s.id.clone(), s)).collect(),
            categories: categories.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    /// Load skills and categories from the store.
    pub fn load<S: SkillStore + ?Sized>(store: &S) -> Result<Self, SkillError> {
        let skills = fetch_skills(store)?;
        let categories = fetch_skill_categories(store)?;
        Ok(Self::from_parts(skills, categories))
    }

    /// All skills in id order.
    pub fn skills(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    /// All categories in id order.
    pub fn categories(&self) -> impl Iterator<Item = &SkillCategory> {
        self.categories.values()
    }

    #[must_use]
    pub fn skill(&self, id: &SkillId) -> Option<&Skill> {
        self.skills.get(id)
    }

    #[must_use]
    pub fn category(&self, id: &CategoryId) -> Option<&SkillCategory> {
        self.categories.get(id)
    }

    /// Find a skill by id, falling back to an exact name match.
    ///
    /// Categories and related-skill lists reference skills by either.
    #[must_use]
    pub fn resolve(&self, reference: &str) -> Option<&Skill> {
        self.skills
            .values()
            .find(|s| s.id.as_str() == reference)
            .or_else(|| self.skills.values().find(|s| s.name == reference))
    }

    /// Skills belonging to a category: its listed members that exist in the
    /// catalog, plus skills whose `category` field names it.
    #[must_use]
    pub fn skills_in_category(&self, id: &CategoryId) -> Vec<&Skill> {
        let Some(category) = self.categories.get(id) else {
            return Vec::new();
        };

        let mut seen = BTreeSet::new();
        let listed = category.skills.iter().filter_map(|r| self.resolve(r));
        let tagged = self.skills.values().filter(|s| s.category == category.name);
        listed
            .chain(tagged)
            .filter(|s| seen.insert(s.id.clone()))
            .collect()
    }

    /// Related skills of `id` that exist in the catalog.
    #[must_use]
    pub fn related_skills(&self, id: &SkillId) -> Vec<&Skill> {
        let Some(skill) = self.skills.get(id) else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        skill
            .related_skills
            .iter()
            .filter_map(|r| self.resolve(r))
            .filter(|s| s.id != *id && seen.insert(s.id.clone()))
            .collect()
    }

    #[must_use]
    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    #[must_use]
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.categories.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Snapshot, import_snapshot};
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn seeded_catalog() -> Catalog {
        let mut store = MemoryStore::new();
        import_snapshot(&mut store, Snapshot::seed(), Utc::now()).expect("seed");
        Catalog::load(&store).expect("load")
    }

    fn names(skills: &[&Skill]) -> Vec<String> {
        skills.iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn load_reads_every_document() {
        let catalog = seeded_catalog();
        assert_eq!(catalog.skill_count(), 3);
        assert_eq!(catalog.category_count(), 3);
        assert!(!catalog.is_empty());
    }

    #[test]
    fn resolve_by_id_or_name() {
        let catalog = seeded_catalog();
        let by_id = catalog.resolve("1").map(|s| s.name.clone());
        assert_eq!(by_id.as_deref(), Some("JavaScript"));
        let by_name = catalog.resolve("React").map(|s| s.id.to_string());
        assert_eq!(by_name.as_deref(), Some("2"));
        assert!(catalog.resolve("Cobol").is_none());
    }

    #[test]
    fn related_skills_skip_unknown_names() {
        let catalog = seeded_catalog();
        let js = SkillId::new("1").expect("id");
        // JavaScript lists React, Node.js and TypeScript; only the first two exist.
        assert_eq!(
            names(&catalog.related_skills(&js)),
            vec!["React", "Node.js"]
        );
    }

    #[test]
    fn skills_in_category_merges_members_and_tags() {
        let catalog = seeded_catalog();
        let frontend = catalog
            .categories()
            .find(|c| c.name == "Frontend Frameworks")
            .map(|c| c.id.clone())
            .expect("frontend category");
        assert_eq!(names(&catalog.skills_in_category(&frontend)), vec!["React"]);

        let missing = CategoryId::new("nope").expect("id");
        assert!(catalog.skills_in_category(&missing).is_empty());
    }
}
