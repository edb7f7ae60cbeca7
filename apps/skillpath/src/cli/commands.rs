//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::{
    Backend, DEFAULT_HOST, DEFAULT_PORT, FileConfig, ServerSettings, StorageSettings,
};
use chrono::Utc;
use serde::Serialize;
use skillpath_core::{
    AssessmentRequest, Outcome, ProficiencyUpdate, Session, SkillError, SkillStore, Snapshot,
    UserId, export_snapshot, import_snapshot,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for snapshot import (100 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 100 * 1024 * 1024;

fn io_err(context: &str, e: impl std::fmt::Display) -> SkillError {
    SkillError::StoreUnavailable(format!("{context}: {e}"))
}

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), SkillError> {
    let metadata = std::fs::metadata(path).map_err(|e| io_err("Cannot read file metadata", e))?;

    if metadata.len() > max_size {
        return Err(SkillError::InvalidRecord(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and ensure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, SkillError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| io_err(&format!("Invalid file path '{}'", path.display()), e))?;

    if !canonical.is_file() {
        return Err(SkillError::InvalidRecord(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent of an output path and ensure it is a directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, SkillError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        io_err(
            &format!("Invalid output directory '{}'", parent.display()),
            e,
        )
    })?;

    if !canonical_parent.is_dir() {
        return Err(SkillError::InvalidRecord(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| SkillError::InvalidRecord("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<(), SkillError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| SkillError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// A degraded read is a failure on the command line.
fn require<T>(outcome: Outcome<T>) -> Result<T, SkillError> {
    match outcome.degraded {
        Some(e) => Err(e),
        None => Ok(outcome.value),
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    storage: &StorageSettings,
    file: &FileConfig,
    host: Option<String>,
    port: Option<u16>,
    seed: bool,
) -> Result<(), SkillError> {
    let host = host
        .or_else(|| file.server.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = port.or(file.server.port).unwrap_or(DEFAULT_PORT);
    let settings = ServerSettings::resolve(file, |key| std::env::var(key).ok());

    let mut session = open_session(storage)?;
    if seed && session.store().counts()?.skills == 0 {
        let report = import_snapshot(session.store_mut(), Snapshot::seed(), Utc::now())?;
        tracing::info!(skills = report.skills, "loaded sample dataset");
    }

    println!("SkillPath Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", host);
    println!("  Port:       {}", port);
    println!("  Backend:    {}", storage.backend);
    println!("  Database:   {:?}", storage.database);
    println!("  Rate limit: {}/s", settings.rate_limit);
    println!();
    println!("Endpoints:");
    println!("  GET    /skills                              - Skill definitions");
    println!("  GET    /categories                          - Skill categories");
    println!("  GET    /users/{{user}}/skills                 - Proficiency records");
    println!("  PUT    /users/{{user}}/skills/{{skill}}         - Set a proficiency");
    println!("  POST   /users/{{user}}/assessments            - Assess skills");
    println!("  GET    /users/{{user}}/assessments            - Assessment history");
    println!("  GET    /users/{{user}}/context                - Session context");
    println!("  GET    /health                              - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, session, &settings).await
}

// =============================================================================
// INIT / SEED / STATUS
// =============================================================================

/// Initialize new database.
pub fn cmd_init(storage: &StorageSettings, force: bool) -> Result<(), SkillError> {
    if storage.backend == Backend::Memory {
        println!("The memory backend needs no initialization");
        return Ok(());
    }

    let db_path = &storage.database;
    if db_path.exists() {
        if !force {
            return Err(SkillError::InvalidRecord(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path).map_err(|e| io_err("Remove database", e))?;
    }

    let _session = Session::with_redb(db_path)?;
    println!("Initialized new redb database at {:?}", db_path);
    Ok(())
}

/// Load the sample dataset into an empty store.
pub fn cmd_seed(storage: &StorageSettings, json_mode: bool) -> Result<(), SkillError> {
    let mut session = open_session(storage)?;
    let counts = session.store().counts()?;
    if counts.skills + counts.skill_categories + counts.user_skills > 0 {
        return Err(SkillError::InvalidRecord(
            "Database already contains documents. Run `init --force` first.".to_string(),
        ));
    }

    let report = import_snapshot(session.store_mut(), Snapshot::seed(), Utc::now())?;
    warn_if_volatile(storage);

    if json_mode {
        return print_json(&report);
    }
    println!(
        "Seeded {} skills, {} categories, {} user skills",
        report.skills, report.skill_categories, report.user_skills
    );
    Ok(())
}

/// Show document counts.
pub fn cmd_status(storage: &StorageSettings, json_mode: bool) -> Result<(), SkillError> {
    let session = open_session(storage)?;
    let counts = session.store().counts()?;

    if json_mode {
        let output = serde_json::json!({
            "database": storage.database.to_string_lossy(),
            "backend": storage.backend.as_str(),
            "counts": counts,
        });
        return print_json(&output);
    }

    println!("SkillPath Status");
    println!("================");
    println!("Database: {:?}", storage.database);
    println!("Backend:  {}", storage.backend);
    println!();
    println!("Skills:       {}", counts.skills);
    println!("Categories:   {}", counts.skill_categories);
    println!("User skills:  {}", counts.user_skills);
    println!("Assessments:  {}", counts.assessments);

    Ok(())
}

// =============================================================================
// CATALOG COMMANDS
// =============================================================================

/// List skill definitions.
pub fn cmd_skills(storage: &StorageSettings, json_mode: bool) -> Result<(), SkillError> {
    let session = open_session(storage)?;
    let catalog = require(session.load_catalog())?;

    if json_mode {
        let skills: Vec<_> = catalog.skills().collect();
        return print_json(&skills);
    }

    if catalog.skill_count() == 0 {
        println!("No skills defined");
        return Ok(());
    }
    for skill in catalog.skills() {
        println!("[{}] {} ({})", skill.id, skill.name, skill.category);
        if !skill.description.is_empty() {
            println!("    {}", skill.description);
        }
        for level in &skill.proficiency_levels {
            println!("    {}. {} - {}", level.level, level.name, level.description);
        }
        let related: Vec<&str> = catalog
            .related_skills(&skill.id)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        if !related.is_empty() {
            println!("    Related: {}", related.join(", "));
        }
    }
    Ok(())
}

/// List skill categories.
pub fn cmd_categories(storage: &StorageSettings, json_mode: bool) -> Result<(), SkillError> {
    let session = open_session(storage)?;
    let catalog = require(session.load_catalog())?;

    if json_mode {
        let categories: Vec<_> = catalog.categories().collect();
        return print_json(&categories);
    }

    if catalog.category_count() == 0 {
        println!("No categories defined");
        return Ok(());
    }
    for category in catalog.categories() {
        println!("[{}] {}", category.id, category.name);
        if !category.description.is_empty() {
            println!("    {}", category.description);
        }
        let members: Vec<&str> = catalog
            .skills_in_category(&category.id)
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        println!("    Skills: {}", members.join(", "));
    }
    Ok(())
}

// =============================================================================
// USER COMMANDS
// =============================================================================

/// List a user's proficiency records.
pub fn cmd_user_skills(
    storage: &StorageSettings,
    json_mode: bool,
    user: &str,
) -> Result<(), SkillError> {
    let user = UserId::new(user)?;
    let session = open_session(storage)?;
    let records = require(session.load_user_skills(&user))?;

    if json_mode {
        return print_json(&records);
    }

    println!("Skills of user {}:", user);
    if records.is_empty() {
        println!("  (none)");
    }
    for r in &records {
        println!(
            "  skill {:<8} proficiency {:>3}  confidence {:.2}  updated {}",
            r.skill_id,
            r.proficiency.value(),
            r.confidence.value(),
            r.last_updated.to_rfc3339()
        );
    }
    Ok(())
}

/// Set a proficiency.
pub fn cmd_update(
    storage: &StorageSettings,
    json_mode: bool,
    user: &str,
    skill: &str,
    proficiency: i64,
) -> Result<(), SkillError> {
    let update = ProficiencyUpdate::parse(user, skill, proficiency)?;
    let mut session = open_session(storage)?;
    let record = session.update_skill_proficiency(&update, Utc::now())?;
    warn_if_volatile(storage);

    if json_mode {
        return print_json(&record);
    }
    println!(
        "User {} skill {} -> {} (record {})",
        record.user_id,
        record.skill_id,
        record.proficiency.value(),
        record.id
    );
    Ok(())
}

/// Assess a user's skills.
pub fn cmd_assess(
    storage: &StorageSettings,
    json_mode: bool,
    user: &str,
    skills: &[String],
) -> Result<(), SkillError> {
    let request = AssessmentRequest::parse(user, skills)?;
    let mut session = open_session(storage)?;
    let outcome = session.assess_skills(&request, Utc::now())?;

    if json_mode {
        return print_json(&outcome.value);
    }

    let result = &outcome.value;
    let list = |ids: &[skillpath_core::SkillId]| {
        ids.iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("Assessment for user {}", result.user_id);
    println!("==========================");
    println!("Overall score: {}", result.overall_score);
    println!("Strengths:     {}", list(&result.strengths));
    println!("Weaknesses:    {}", list(&result.weaknesses));
    println!("Recommendations:");
    for rec in &result.recommendations {
        println!("  - {}", rec);
    }
    match (&result.id, &outcome.degraded) {
        (Some(id), _) => println!("Recorded as assessment {}", id),
        (None, Some(e)) => println!("Not recorded: {}", e),
        (None, None) => {}
    }
    Ok(())
}

/// Show a user's assessment log.
pub fn cmd_history(
    storage: &StorageSettings,
    json_mode: bool,
    user: &str,
) -> Result<(), SkillError> {
    let user = UserId::new(user)?;
    let session = open_session(storage)?;
    let history = require(session.assessment_history(&user))?;

    if json_mode {
        return print_json(&history);
    }

    println!("Assessments of user {}:", user);
    if history.is_empty() {
        println!("  (none)");
    }
    for result in &history {
        println!(
            "  {}  score {:>3}  skills {}  {}",
            result.assessed_at.to_rfc3339(),
            result.overall_score,
            result.skills.len(),
            result.id.as_ref().map(|id| id.as_str()).unwrap_or("-")
        );
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Export all collections to a JSON snapshot.
pub fn cmd_export(storage: &StorageSettings, output: &Path) -> Result<(), SkillError> {
    let validated_output = validate_output_path(output)?;
    let session = open_session(storage)?;
    let snapshot = export_snapshot(session.store())?;

    let data = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| SkillError::SerializationError(e.to_string()))?;
    std::fs::write(&validated_output, &data).map_err(|e| io_err("Write file", e))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

/// Import a JSON snapshot.
pub fn cmd_import(
    storage: &StorageSettings,
    json_mode: bool,
    input: &Path,
) -> Result<(), SkillError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path).map_err(|e| io_err("Read file", e))?;
    let snapshot: Snapshot = serde_json::from_slice(&data)
        .map_err(|e| SkillError::InvalidRecord(format!("Invalid snapshot: {e}")))?;

    let mut session = open_session(storage)?;
    let report = import_snapshot(session.store_mut(), snapshot, Utc::now())?;
    warn_if_volatile(storage);

    if json_mode {
        return print_json(&report);
    }
    println!(
        "Imported {} skills, {} categories, {} user skills, {} assessments",
        report.skills, report.skill_categories, report.user_skills, report.assessments
    );
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open a session on the configured backend.
pub fn open_session(storage: &StorageSettings) -> Result<Session, SkillError> {
    match storage.backend {
        Backend::Redb => Session::with_redb(&storage.database),
        Backend::Memory => Ok(Session::new()),
    }
}

fn warn_if_volatile(storage: &StorageSettings) {
    if storage.backend == Backend::Memory {
        tracing::warn!("memory backend: changes are discarded when the command exits");
    }
}

// =============================================================================
// TESTS
// =============================================================================
