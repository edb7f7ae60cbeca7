//! # Session Module
//!
//! Session management combining a document store with volatile per-user
//! context.
//!
//! The context (selected skills, cached records, last assessment, last
//! error) is session-local:
//! - Never serialized to disk
//! - Cleared per user with `clear_context`
//! - Used as the fallback source when the store is unreachable
//!
//! The last catalog loaded without error is cached the same way.
//!
//! ## Storage Backends
//!
//! `Session` is generic over any `SkillStore`. The default,
//! `StorageBackend`, supports two backends:
//! - `InMemory`: Uses `MemoryStore` (fast, volatile unless exported)
//! - `Persistent`: Uses `RedbStore` for disk-backed ACID storage
//!
//! ## Degradation
//!
//! Reads that hit a data-access failure return an empty value wrapped in an
//! [`Outcome`] carrying the error. Assessment builds a fallback result.
//! Validation errors are always returned as `Err`.

use crate::assessment::{AssessmentEngine, AssessmentRequest};
use crate::catalog::Catalog;
use crate::proficiency::{ProficiencyUpdate, get_user_skills, update_proficiency};
use crate::storage::{CollectionCounts, MemoryStore, RedbStore, SkillStore};
use crate::{
    AssessmentResult, ErrorKind, Proficiency, RecordId, Skill, SkillCategory, SkillError, SkillId,
    UserId, UserSkill,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Self::InMemory($store) => $call,
            Self::Persistent($store) => $call,
        }
    };
}

impl SkillStore for StorageBackend {
    fn skills(&self) -> Result<Vec<Skill>, SkillError> {
        dispatch!(self, s => s.skills())
    }

    fn categories(&self) -> Result<Vec<SkillCategory>, SkillError> {
        dispatch!(self, s => s.categories())
    }

    fn put_skill(&mut self, skill: Skill) -> Result<(), SkillError> {
        dispatch!(self, s => s.put_skill(skill))
    }

    fn put_category(&mut self, category: SkillCategory) -> Result<(), SkillError> {
        dispatch!(self, s => s.put_category(category))
    }

    fn user_skills(&self, user: &UserId) -> Result<Vec<UserSkill>, SkillError> {
        dispatch!(self, s => s.user_skills(user))
    }

    fn all_user_skills(&self) -> Result<Vec<UserSkill>, SkillError> {
        dispatch!(self, s => s.all_user_skills())
    }

    fn upsert_proficiency(
        &mut self,
        user: &UserId,
        skill: &SkillId,
        proficiency: Proficiency,
        now: DateTime<Utc>,
    ) -> Result<UserSkill, SkillError> {
        dispatch!(self, s => s.upsert_proficiency(user, skill, proficiency, now))
    }

    fn put_user_skill(&mut self, record: UserSkill) -> Result<(), SkillError> {
        dispatch!(self, s => s.put_user_skill(record))
    }

    fn append_assessment(
        &mut self,
        result: AssessmentResult,
    ) -> Result<AssessmentResult, SkillError> {
        dispatch!(self, s => s.append_assessment(result))
    }

    fn assessments(&self, user: &UserId) -> Result<Vec<AssessmentResult>, SkillError> {
        dispatch!(self, s => s.assessments(user))
    }

    fn all_assessments(&self) -> Result<Vec<AssessmentResult>, SkillError> {
        dispatch!(self, s => s.all_assessments())
    }

    fn allocate_id(&mut self, collection: &'static str) -> Result<RecordId, SkillError> {
        dispatch!(self, s => s.allocate_id(collection))
    }

    fn counts(&self) -> Result<CollectionCounts, SkillError> {
        dispatch!(self, s => s.counts())
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// A value that may have been degraded by a data-access failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    /// The error that forced a fallback, if any.
    pub degraded: Option<SkillError>,
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn ok(value: T) -> Self {
        Self {
            value,
            degraded: None,
        }
    }

    #[must_use]
    pub fn degraded(value: T, error: SkillError) -> Self {
        Self {
            value,
            degraded: Some(error),
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

// =============================================================================
// USER CONTEXT
// =============================================================================

/// Volatile per-user state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserContext {
    /// Skills chosen for the next assessment, in selection order.
    selected: Vec<SkillId>,
    /// Last records seen for this user, keyed by skill.
    cached: BTreeMap<SkillId, UserSkill>,
    assessment: Option<AssessmentResult>,
    last_error: Option<SkillError>,
}

impl UserContext {
    #[must_use]
    pub fn selected(&self) -> &[SkillId] {
        &self.selected
    }

    pub fn cached(&self) -> impl Iterator<Item = &UserSkill> {
        self.cached.values()
    }

    #[must_use]
    pub fn assessment(&self) -> Option<&AssessmentResult> {
        self.assessment.as_ref()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&SkillError> {
        self.last_error.as_ref()
    }

    fn remember(&mut self, records: impl IntoIterator<Item = UserSkill>) {
        for record in records {
            self.cached.insert(record.skill_id.clone(), record);
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

fn log_degraded(operation: &'static str, error: &SkillError) {
    tracing::warn!(operation, code = error.code(), error = %error, "degraded to fallback");
}

/// Session-local state that is never written to the store.
#[derive(Debug, Default)]
struct Volatile {
    contexts: BTreeMap<UserId, UserContext>,
    /// Last catalog loaded without error.
    catalog: Catalog,
    /// Error from the last catalog load, if it degraded.
    catalog_error: Option<SkillError>,
}

impl Volatile {
    fn context_mut(&mut self, user: &UserId) -> &mut UserContext {
        self.contexts.entry(user.clone()).or_default()
    }

    fn record_error(&mut self, user: &UserId, operation: &'static str, error: &SkillError) {
        log_degraded(operation, error);
        self.context_mut(user).last_error = Some(error.clone());
    }
}

/// A Session combines a store with per-user volatile context.
///
/// Reads take `&self` and keep their cache and error bookkeeping behind a
/// mutex. Writes take `&mut self`.
///
/// Note: Session does NOT implement Clone; the redb handle cannot be shared.
#[derive(Debug, Default)]
pub struct Session<S = StorageBackend> {
    store: S,
    volatile: Mutex<Volatile>,
}

impl Session<StorageBackend> {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, SkillError> {
        Ok(Self::with_store(StorageBackend::Persistent(RedbStore::open(
            path,
        )?)))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.store, StorageBackend::Persistent(_))
    }
}

impl<S: SkillStore> Session<S> {
    /// Create a session over any store.
    #[must_use]
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            volatile: Mutex::default(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // Poisoning is ignored; the state is plain data.
    fn volatile(&self) -> MutexGuard<'_, Volatile> {
        self.volatile.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn volatile_mut(&mut self) -> &mut Volatile {
        self.volatile.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the volatile context of `user`, if the session has seen them.
    #[must_use]
    pub fn context(&self, user: &UserId) -> Option<UserContext> {
        self.volatile().contexts.get(user).cloned()
    }

    /// Drop all volatile state of `user`.
    pub fn clear_context(&mut self, user: &UserId) {
        self.volatile_mut().contexts.remove(user);
    }

    /// The last catalog loaded without error. Empty until a load succeeds.
    #[must_use]
    pub fn cached_catalog(&self) -> Catalog {
        self.volatile().catalog.clone()
    }

    #[must_use]
    pub fn catalog_error(&self) -> Option<SkillError> {
        self.volatile().catalog_error.clone()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Load skills and categories and cache them.
    ///
    /// Degrades to an empty catalog; the cached one stays as it was.
    pub fn load_catalog(&self) -> Outcome<Catalog> {
        let loaded = Catalog::load(&self.store);
        let mut volatile = self.volatile();
        match loaded {
            Ok(catalog) => {
                volatile.catalog = catalog.clone();
                volatile.catalog_error = None;
                Outcome::ok(catalog)
            }
            Err(e) => {
                log_degraded("load_catalog", &e);
                volatile.catalog_error = Some(e.clone());
                Outcome::degraded(Catalog::new(), e)
            }
        }
    }

    /// Load a user's records and refresh their cache. Degrades to an empty
    /// list, leaving the cache as it was.
    pub fn load_user_skills(&self, user: &UserId) -> Outcome<Vec<UserSkill>> {
        let loaded = get_user_skills(&self.store, user);
        let mut volatile = self.volatile();
        match loaded {
            Ok(records) => {
                let context = volatile.context_mut(user);
                context.cached.clear();
                context.remember(records.iter().cloned());
                context.last_error = None;
                Outcome::ok(records)
            }
            Err(e) => {
                volatile.record_error(user, "load_user_skills", &e);
                Outcome::degraded(Vec::new(), e)
            }
        }
    }

    /// Logged assessments of a user, oldest first. Degrades to an empty list.
    pub fn assessment_history(&self, user: &UserId) -> Outcome<Vec<AssessmentResult>> {
        match self.store.assessments(user) {
            Ok(results) => Outcome::ok(results),
            Err(e) => {
                self.volatile().record_error(user, "assessment_history", &e);
                Outcome::degraded(Vec::new(), e)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Set one proficiency value.
    ///
    /// Failures are recorded in the user's context and returned; nothing is
    /// changed locally.
    pub fn update_skill_proficiency(
        &mut self,
        update: &ProficiencyUpdate,
        now: DateTime<Utc>,
    ) -> Result<UserSkill, SkillError> {
        let written = update_proficiency(&mut self.store, update, now);
        let volatile = self.volatile_mut();
        match written {
            Ok(record) => {
                let context = volatile.context_mut(&update.user_id);
                context.remember([record.clone()]);
                context.last_error = None;
                Ok(record)
            }
            Err(e) => {
                volatile.record_error(&update.user_id, "update_skill_proficiency", &e);
                Err(e)
            }
        }
    }

    /// Score and record an assessment.
    ///
    /// Validation errors (including no matching records) are returned as
    /// `Err`. Data-access failures yield an unpersisted fallback:
    /// 1. the computed result, if only persisting failed
    /// 2. a result scored from cached records
    /// 3. the placeholder result
    pub fn assess_skills(
        &mut self,
        request: &AssessmentRequest,
        now: DateTime<Utc>,
    ) -> Result<Outcome<AssessmentResult>, SkillError> {
        let user = &request.user_id;

        let outcome = match AssessmentEngine::prepare(&self.store, request, now) {
            Ok(prepared) => match AssessmentEngine::persist(&mut self.store, prepared.clone()) {
                Ok(stored) => Outcome::ok(stored),
                Err(e) => Outcome::degraded(prepared, e),
            },
            Err(e) if e.kind() == ErrorKind::Validation => return Err(e),
            Err(e) => {
                let cached: Vec<UserSkill> = self
                    .volatile_mut()
                    .contexts
                    .get(user)
                    .map(|c| c.cached.values().cloned().collect())
                    .unwrap_or_default();
                let fallback = AssessmentEngine::from_cache(request, cached.clone(), now)
                    .unwrap_or_else(|_| {
                        AssessmentEngine::placeholder(request, request.select(cached), now)
                    });
                Outcome::degraded(fallback, e)
            }
        };

        let volatile = self.volatile_mut();
        match &outcome.degraded {
            Some(e) => volatile.record_error(user, "assess_skills", e),
            None => volatile.context_mut(user).last_error = None,
        }
        let context = volatile.context_mut(user);
        context.remember(outcome.value.skills.iter().cloned());
        context.assessment = Some(outcome.value.clone());
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Add a skill to the user's selection. Returns false if already selected.
    pub fn select_skill(&mut self, user: &UserId, skill: SkillId) -> bool {
        let context = self.volatile_mut().context_mut(user);
        if context.selected.contains(&skill) {
            return false;
        }
        context.selected.push(skill);
        true
    }

    /// Remove a skill from the user's selection. Returns false if absent.
    pub fn deselect_skill(&mut self, user: &UserId, skill: &SkillId) -> bool {
        let context = self.volatile_mut().context_mut(user);
        let before = context.selected.len();
        context.selected.retain(|s| s != skill);
        context.selected.len() != before
    }

    /// Forget the last assessment shown to the user.
    pub fn clear_assessment(&mut self, user: &UserId) {
        if let Some(context) = self.volatile_mut().contexts.get_mut(user) {
            context.assessment = None;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::PLACEHOLDER_SCORE;

    /// A store whose reads and/or writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        reads_fail: bool,
        writes_fail: bool,
    }

    fn down() -> SkillError {
        SkillError::StoreUnavailable("connection refused".into())
    }

    impl FlakyStore {
        fn read(&self) -> Result<&MemoryStore, SkillError> {
            if self.reads_fail { Err(down()) } else { Ok(&self.inner) }
        }

        fn write(&mut self) -> Result<&mut MemoryStore, SkillError> {
            if self.writes_fail { Err(down()) } else { Ok(&mut self.inner) }
        }
    }

    impl SkillStore for FlakyStore {
        fn skills(&self) -> Result<Vec<Skill>, SkillError> {
            self.read()?.skills()
        }
        fn categories(&self) -> Result<Vec<SkillCategory>, SkillError> {
            self.read()?.categories()
        }
        fn put_skill(&mut self, skill: Skill) -> Result<(), SkillError> {
            self.write()?.put_skill(skill)
        }
        fn put_category(&mut self, category: SkillCategory) -> Result<(), SkillError> {
            self.write()?.put_category(category)
        }
        fn user_skills(&self, user: &UserId) -> Result<Vec<UserSkill>, SkillError> {
            self.read()?.user_skills(user)
        }
        fn all_user_skills(&self) -> Result<Vec<UserSkill>, SkillError> {
            self.read()?.all_user_skills()
        }
        fn upsert_proficiency(
            &mut self,
            user: &UserId,
            skill: &SkillId,
            proficiency: Proficiency,
            now: DateTime<Utc>,
        ) -> Result<UserSkill, SkillError> {
            self.write()?.upsert_proficiency(user, skill, proficiency, now)
        }
        fn put_user_skill(&mut self, record: UserSkill) -> Result<(), SkillError> {
            self.write()?.put_user_skill(record)
        }
        fn append_assessment(
            &mut self,
            result: AssessmentResult,
        ) -> Result<AssessmentResult, SkillError> {
            self.write()?.append_assessment(result)
        }
        fn assessments(&self, user: &UserId) -> Result<Vec<AssessmentResult>, SkillError> {
            self.read()?.assessments(user)
        }
        fn all_assessments(&self) -> Result<Vec<AssessmentResult>, SkillError> {
            self.read()?.all_assessments()
        }
        fn allocate_id(&mut self, collection: &'static str) -> Result<RecordId, SkillError> {
            self.write()?.allocate_id(collection)
        }
    }

    fn user() -> UserId {
        UserId::new("1").expect("user")
    }

    fn seeded() -> Session<FlakyStore> {
        let mut session = Session::with_store(FlakyStore::default());
        for (skill, value) in [("1", 85), ("2", 75), ("3", 65)] {
            let update = ProficiencyUpdate::parse("1", skill, value).expect("parse");
            session
                .update_skill_proficiency(&update, Utc::now())
                .expect("update");
        }
        session
    }

    #[test]
    fn default_session_is_in_memory() {
        let session = Session::new();
        assert!(!session.is_persistent());
        assert!(session.context(&user()).is_none());
    }

    #[test]
    fn assess_persists_and_remembers_result() {
        let mut session = seeded();
        let request = AssessmentRequest::parse("1", ["1", "2", "3"]).expect("parse");

        let outcome = session.assess_skills(&request, Utc::now()).expect("assess");

        assert!(!outcome.is_degraded());
        assert!(outcome.value.is_persisted());
        assert_eq!(outcome.value.overall_score, 75);
        let context = session.context(&user()).expect("context");
        assert_eq!(context.assessment(), Some(&outcome.value));
        assert!(context.last_error().is_none());
    }

    #[test]
    fn failed_persist_returns_computed_result_without_id() {
        let mut session = seeded();
        session.store_mut().writes_fail = true;
        let request = AssessmentRequest::parse("1", ["1", "2", "3"]).expect("parse");

        let outcome = session.assess_skills(&request, Utc::now()).expect("assess");

        assert_eq!(outcome.degraded, Some(down()));
        assert!(!outcome.value.is_persisted());
        assert_eq!(outcome.value.overall_score, 75);
        assert_eq!(
            session.context(&user()).and_then(|c| c.last_error().cloned()),
            Some(down())
        );
    }

    #[test]
    fn unreachable_store_scores_cached_records() {
        let mut session = seeded();
        session.store_mut().reads_fail = true;
        let request = AssessmentRequest::parse("1", ["1", "3"]).expect("parse");

        let outcome = session.assess_skills(&request, Utc::now()).expect("assess");

        assert!(outcome.is_degraded());
        // (85 + 65) / 2
        assert_eq!(outcome.value.overall_score, 75);
        assert_eq!(outcome.value.skills.len(), 2);
    }

    #[test]
    fn unreachable_store_without_cache_uses_placeholder() {
        let mut session = Session::with_store(FlakyStore {
            reads_fail: true,
            ..FlakyStore::default()
        });
        let request = AssessmentRequest::parse("1", ["1"]).expect("parse");

        let outcome = session.assess_skills(&request, Utc::now()).expect("assess");

        assert!(outcome.is_degraded());
        assert_eq!(outcome.value.overall_score, PLACEHOLDER_SCORE);
        assert!(outcome.value.skills.is_empty());
    }

    #[test]
    fn no_matching_records_is_not_replaced_by_fallback() {
        let mut session = seeded();
        let request = AssessmentRequest::parse("1", ["42"]).expect("parse");
        assert_eq!(
            session.assess_skills(&request, Utc::now()),
            Err(SkillError::NoMatchingRecords)
        );
    }

    #[test]
    fn reads_degrade_to_empty() {
        let mut session = seeded();
        session.store_mut().reads_fail = true;

        let catalog = session.load_catalog();
        assert!(catalog.is_degraded());
        assert!(catalog.value.is_empty());
        assert_eq!(session.catalog_error(), Some(down()));

        let records = session.load_user_skills(&user());
        assert!(records.value.is_empty());
        assert_eq!(records.degraded, Some(down()));
        // Cache survives a failed load.
        assert_eq!(session.context(&user()).expect("ctx").cached().count(), 3);

        let history = session.assessment_history(&user());
        assert!(history.value.is_empty());
        assert!(history.is_degraded());
    }

    #[test]
    fn failed_catalog_reload_keeps_cached_catalog() {
        let mut session = Session::with_store(FlakyStore::default());
        crate::snapshot::import_snapshot(
            session.store_mut(),
            crate::snapshot::Snapshot::seed(),
            Utc::now(),
        )
        .expect("seed");
        assert!(session.cached_catalog().is_empty());

        let loaded = session.load_catalog();
        assert!(!loaded.is_degraded());
        assert_eq!(session.cached_catalog(), loaded.value);

        session.store_mut().reads_fail = true;
        let reload = session.load_catalog();
        assert!(reload.value.is_empty());
        assert_eq!(session.catalog_error(), Some(down()));
        assert_eq!(session.cached_catalog(), loaded.value);
        assert_eq!(session.cached_catalog().skill_count(), 3);

        session.store_mut().reads_fail = false;
        session.load_catalog();
        assert!(session.catalog_error().is_none());
    }

    #[test]
    fn reads_share_the_session() {
        let session = seeded();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    assert_eq!(session.load_user_skills(&user()).value.len(), 3);
                    assert!(!session.load_catalog().is_degraded());
                });
            }
        });
        assert_eq!(session.context(&user()).expect("ctx").cached().count(), 3);
    }

    #[test]
    fn failed_update_is_returned_and_recorded() {
        let mut session = seeded();
        session.store_mut().writes_fail = true;
        let update = ProficiencyUpdate::parse("1", "1", 10).expect("parse");

        assert_eq!(session.update_skill_proficiency(&update, Utc::now()), Err(down()));
        let context = session.context(&user()).expect("context");
        assert_eq!(context.last_error(), Some(&down()));
        let cached_js = context
            .cached()
            .find(|r| r.skill_id.as_str() == "1")
            .expect("cached");
        assert_eq!(cached_js.proficiency.value(), 85);
    }

    #[test]
    fn selection_is_ordered_and_idempotent() {
        let mut session = Session::new();
        let skill = |id: &str| SkillId::new(id).expect("skill");

        assert!(session.select_skill(&user(), skill("2")));
        assert!(session.select_skill(&user(), skill("1")));
        assert!(!session.select_skill(&user(), skill("2")));
        assert!(session.deselect_skill(&user(), &skill("2")));
        assert!(!session.deselect_skill(&user(), &skill("9")));

        let context = session.context(&user()).expect("context");
        assert_eq!(context.selected(), &[skill("1")]);
    }

    #[test]
    fn clear_assessment_keeps_other_state() {
        let mut session = seeded();
        let request = AssessmentRequest::parse("1", ["1"]).expect("parse");
        session.assess_skills(&request, Utc::now()).expect("assess");
        session.select_skill(&user(), SkillId::new("1").expect("id"));

        session.clear_assessment(&user());

        let context = session.context(&user()).expect("context");
        assert!(context.assessment().is_none());
        assert_eq!(context.selected().len(), 1);

        session.clear_context(&user());
        assert!(session.context(&user()).is_none());
    }
}
