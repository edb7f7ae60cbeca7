//! # redb-backed Document Store
//!
//! A disk-backed `SkillStore` using the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Each collection is a table of `document id -> postcard bytes`. A metadata
//! table holds the last id handed out per collection. Read-modify-write
//! operations (proficiency upsert, id allocation) run inside a single write
//! transaction.

use super::{
    CollectionCounts, SkillStore, assessment_logged, check_user_skill_slot, sort_assessments,
};
use crate::primitives::{
    ASSESSMENTS_COLLECTION, CATEGORIES_COLLECTION, SKILLS_COLLECTION, USER_SKILLS_COLLECTION,
};
use crate::{
    AssessmentResult, Confidence, Proficiency, RecordId, Skill, SkillCategory, SkillError,
    SkillId, UserId, UserSkill,
};
use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

type Documents = TableDefinition<'static, &'static str, &'static [u8]>;

/// Table for skills: skill id -> serialized Skill
const SKILLS: Documents = TableDefinition::new(SKILLS_COLLECTION);

/// Table for categories: category id -> serialized SkillCategory
const CATEGORIES: Documents = TableDefinition::new(CATEGORIES_COLLECTION);

/// Table for proficiency records: record id -> serialized UserSkill
const USER_SKILLS: Documents = TableDefinition::new(USER_SKILLS_COLLECTION);

/// Table for the assessment log: record id -> serialized AssessmentResult
const ASSESSMENTS: Documents = TableDefinition::new(ASSESSMENTS_COLLECTION);

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

fn store_err(e: impl std::fmt::Display) -> SkillError {
    SkillError::StoreUnavailable(e.to_string())
}

fn encode<T: Serialize>(doc: &T) -> Result<Vec<u8>, SkillError> {
    postcard::to_allocvec(doc).map_err(|e| SkillError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SkillError> {
    postcard::from_bytes(bytes).map_err(|e| SkillError::SerializationError(e.to_string()))
}

fn counter_key(collection: &str) -> String {
    format!("next_id:{collection}")
}

/// Reserve the next unused id in `docs`, advancing the collection counter.
fn next_free_id(
    meta: &mut Table<'_, &'static str, u64>,
    docs: &Table<'_, &'static str, &'static [u8]>,
    collection: &'static str,
) -> Result<RecordId, SkillError> {
    let key = counter_key(collection);
    let mut next = meta
        .get(key.as_str())
        .map_err(store_err)?
        .map(|v| v.value())
        .unwrap_or(0);
    loop {
        next = next.saturating_add(1);
        let candidate = next.to_string();
        if docs.get(candidate.as_str()).map_err(store_err)?.is_none() {
            meta.insert(key.as_str(), next).map_err(store_err)?;
            return RecordId::new(candidate);
        }
    }
}

/// A disk-backed document store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SkillError> {
        let db = Database::create(path.as_ref()).map_err(store_err)?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(store_err)?;
        for definition in [SKILLS, CATEGORIES, USER_SKILLS, ASSESSMENTS] {
            let _ = write_txn.open_table(definition).map_err(store_err)?;
        }
        let _ = write_txn.open_table(METADATA).map_err(store_err)?;
        write_txn.commit().map_err(store_err)?;

        tracing::debug!(path = %path.as_ref().display(), "opened redb store");
        Ok(Self { db })
    }

    fn scan<T: DeserializeOwned>(&self, definition: Documents) -> Result<Vec<T>, SkillError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(definition).map_err(store_err)?;

        let mut docs = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (_, value) = entry.map_err(store_err)?;
            docs.push(decode(value.value())?);
        }
        Ok(docs)
    }

    fn put<T: Serialize>(
        &self,
        definition: Documents,
        id: &str,
        doc: &T,
    ) -> Result<(), SkillError> {
        let bytes = encode(doc)?;
        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = write_txn.open_table(definition).map_err(store_err)?;
            table.insert(id, bytes.as_slice()).map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)
    }

    fn len(&self, definition: Documents) -> Result<usize, SkillError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let table = read_txn.open_table(definition).map_err(store_err)?;
        Ok(table.len().map_err(store_err)? as usize)
    }
}

impl SkillStore for RedbStore {
    fn skills(&self) -> Result<Vec<Skill>, SkillError> {
        self.scan(SKILLS)
    }

    fn categories(&self) -> Result<Vec<SkillCategory>, SkillError> {
        self.scan(CATEGORIES)
    }

    fn put_skill(&mut self, skill: Skill) -> Result<(), SkillError> {
        skill.validate()?;
        self.put(SKILLS, skill.id.as_str(), &skill)
    }

    fn put_category(&mut self, category: SkillCategory) -> Result<(), SkillError> {
        self.put(CATEGORIES, category.id.as_str(), &category)
    }

    fn user_skills(&self, user: &UserId) -> Result<Vec<UserSkill>, SkillError> {
        let mut records: Vec<UserSkill> = self.scan(USER_SKILLS)?;
        records.retain(|record| &record.user_id == user);
        Ok(records)
    }

    fn all_user_skills(&self) -> Result<Vec<UserSkill>, SkillError> {
        self.scan(USER_SKILLS)
    }

    fn upsert_proficiency(
        &mut self,
        user: &UserId,
        skill: &SkillId,
        proficiency: Proficiency,
        now: DateTime<Utc>,
    ) -> Result<UserSkill, SkillError> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let record = {
            let mut table = write_txn.open_table(USER_SKILLS).map_err(store_err)?;

            // Lookup-before-insert within the same transaction.
            let mut existing: Option<UserSkill> = None;
            for entry in table.iter().map_err(store_err)? {
                let (_, value) = entry.map_err(store_err)?;
                let record: UserSkill = decode(value.value())?;
                if &record.user_id == user && &record.skill_id == skill {
                    existing = Some(record);
                    break;
                }
            }

            let record = match existing {
                Some(mut record) => {
                    record.proficiency = proficiency;
                    record.last_updated = now;
                    record
                }
                None => {
                    let mut meta = write_txn.open_table(METADATA).map_err(store_err)?;
                    let id = next_free_id(&mut meta, &table, USER_SKILLS_COLLECTION)?;
                    UserSkill {
                        id,
                        user_id: user.clone(),
                        skill_id: skill.clone(),
                        proficiency,
                        confidence: Confidence::default(),
                        last_assessed: now,
                        last_updated: now,
                    }
                }
            };

            let bytes = encode(&record)?;
            table
                .insert(record.id.as_str(), bytes.as_slice())
                .map_err(store_err)?;
            record
        };
        write_txn.commit().map_err(store_err)?;
        Ok(record)
    }

    fn put_user_skill(&mut self, record: UserSkill) -> Result<(), SkillError> {
        let bytes = encode(&record)?;
        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = write_txn.open_table(USER_SKILLS).map_err(store_err)?;
            for entry in table.iter().map_err(store_err)? {
                let (_, value) = entry.map_err(store_err)?;
                let other: UserSkill = decode(value.value())?;
                check_user_skill_slot(&other, &record)?;
            }
            table
                .insert(record.id.as_str(), bytes.as_slice())
                .map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)
    }

    fn append_assessment(
        &mut self,
        mut result: AssessmentResult,
    ) -> Result<AssessmentResult, SkillError> {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = write_txn.open_table(ASSESSMENTS).map_err(store_err)?;
            if let Some(id) = result.id.clone() {
                if table.get(id.as_str()).map_err(store_err)?.is_some() {
                    return Err(assessment_logged(&id));
                }
            } else {
                let mut meta = write_txn.open_table(METADATA).map_err(store_err)?;
                result.id = Some(next_free_id(&mut meta, &table, ASSESSMENTS_COLLECTION)?);
            }
            let id = result
                .id
                .clone()
                .ok_or_else(|| SkillError::Unknown("assessment id not assigned".into()))?;
            let bytes = encode(&result)?;
            table
                .insert(id.as_str(), bytes.as_slice())
                .map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)?;
        Ok(result)
    }

    fn assessments(&self, user: &UserId) -> Result<Vec<AssessmentResult>, SkillError> {
        let mut results: Vec<AssessmentResult> = self.scan(ASSESSMENTS)?;
        results.retain(|result| &result.user_id == user);
        sort_assessments(&mut results);
        Ok(results)
    }

    fn all_assessments(&self) -> Result<Vec<AssessmentResult>, SkillError> {
        let mut results: Vec<AssessmentResult> = self.scan(ASSESSMENTS)?;
        sort_assessments(&mut results);
        Ok(results)
    }

    fn allocate_id(&mut self, collection: &'static str) -> Result<RecordId, SkillError> {
        let definition = match collection {
            SKILLS_COLLECTION => SKILLS,
            CATEGORIES_COLLECTION => CATEGORIES,
            USER_SKILLS_COLLECTION => USER_SKILLS,
            ASSESSMENTS_COLLECTION => ASSESSMENTS,
            other => {
                return Err(SkillError::InvalidRecord(format!(
                    "unknown collection: {other}"
                )));
            }
        };
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let id = {
            let table = write_txn.open_table(definition).map_err(store_err)?;
            let mut meta = write_txn.open_table(METADATA).map_err(store_err)?;
            next_free_id(&mut meta, &table, collection)?
        };
        write_txn.commit().map_err(store_err)?;
        Ok(id)
    }

    fn counts(&self) -> Result<CollectionCounts, SkillError> {
        Ok(CollectionCounts {
            skills: self.len(SKILLS)?,
            skill_categories: self.len(CATEGORIES)?,
            user_skills: self.len(USER_SKILLS)?,
            assessments: self.len(ASSESSMENTS)?,
        })
    }
}
