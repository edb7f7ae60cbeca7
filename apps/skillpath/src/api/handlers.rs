//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Path identifiers are validated before any lock is taken. Mutating
//! handlers hold the user's in-flight guard for their whole duration.

use super::{
    AppState,
    types::{
        ApiError, AssessRequest, AssessmentResponse, CategoriesResponse, ContextResponse,
        HealthResponse, HistoryResponse, ProficiencyRequest, SelectionResponse,
        SkillDetailResponse, SkillsResponse, UserSkillsResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use skillpath_core::{
    AssessmentRequest, ProficiencyUpdate, SkillError, SkillId, UserId, UserSkill,
    primitives::SKILLS_COLLECTION,
};

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// CATALOG HANDLERS
// =============================================================================

/// All skill definitions. Degrades to an empty list.
pub async fn skills_handler(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.session.read().await.load_catalog();
    let skills = outcome.value.skills().cloned().collect();
    Json(SkillsResponse::new(skills, outcome.degraded))
}

/// All skill categories. Degrades to an empty list.
pub async fn categories_handler(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.session.read().await.load_catalog();
    let categories = outcome.value.categories().cloned().collect();
    Json(CategoriesResponse::new(categories, outcome.degraded))
}

/// One skill with its related skills.
///
/// If the store is unreachable the last loaded catalog answers; a skill
/// missing from it is a 503.
pub async fn skill_handler(
    State(state): State<AppState>,
    Path(skill_id): Path<String>,
) -> ApiResult<Json<SkillDetailResponse>> {
    let id = SkillId::new(skill_id)?;
    let session = state.session.read().await;
    let outcome = session.load_catalog();
    let catalog = match outcome.degraded {
        None => outcome.value,
        Some(e) => {
            let cached = session.cached_catalog();
            if cached.skill(&id).is_none() {
                return Err(e.into());
            }
            cached
        }
    };
    drop(session);

    let skill = catalog
        .skill(&id)
        .cloned()
        .ok_or_else(|| SkillError::DocumentNotFound {
            collection: SKILLS_COLLECTION,
            id: id.to_string(),
        })?;
    let related = catalog.related_skills(&id).into_iter().cloned().collect();

    Ok(Json(SkillDetailResponse { skill, related }))
}

// =============================================================================
// USER SKILL HANDLERS
// =============================================================================

/// A user's proficiency records. Degrades to an empty list.
pub async fn user_skills_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserSkillsResponse>> {
    let user = UserId::new(user_id)?;
    let outcome = state.session.read().await.load_user_skills(&user);
    Ok(Json(UserSkillsResponse::new(outcome.value, outcome.degraded)))
}

/// Set the proficiency of one (user, skill) pair.
pub async fn update_proficiency_handler(
    State(state): State<AppState>,
    Path((user_id, skill_id)): Path<(String, String)>,
    Json(request): Json<ProficiencyRequest>,
) -> ApiResult<Json<UserSkill>> {
    let update = ProficiencyUpdate::parse(&user_id, &skill_id, request.proficiency)?;
    let _guard = state.in_flight.begin(&update.user_id)?;

    let record = state
        .session
        .write()
        .await
        .update_skill_proficiency(&update, Utc::now())?;
    Ok(Json(record))
}

// =============================================================================
// ASSESSMENT HANDLERS
// =============================================================================

/// Assess the given skills, or the user's selection when none are given.
///
/// 201 when the result was recorded, 200 with `error` set for a fallback.
pub async fn assess_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<AssessRequest>,
) -> ApiResult<(StatusCode, Json<AssessmentResponse>)> {
    let user = UserId::new(user_id)?;
    let _guard = state.in_flight.begin(&user)?;

    let mut session = state.session.write().await;
    let request = match body.skill_ids {
        Some(ids) => AssessmentRequest::parse(user.as_str(), &ids)?,
        None => {
            let selected = session
                .context(&user)
                .map(|c| c.selected().to_vec())
                .unwrap_or_default();
            AssessmentRequest::new(user, selected)?
        }
    };

    let outcome = session.assess_skills(&request, Utc::now())?;
    let status = if outcome.is_degraded() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(AssessmentResponse::new(outcome.value, outcome.degraded)),
    ))
}

/// Logged assessments, oldest first. Degrades to an empty list.
pub async fn history_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let user = UserId::new(user_id)?;
    let outcome = state.session.read().await.assessment_history(&user);
    Ok(Json(HistoryResponse::new(outcome.value, outcome.degraded)))
}

// =============================================================================
// CONTEXT HANDLERS
// =============================================================================

pub async fn context_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ContextResponse>> {
    let user = UserId::new(user_id)?;
    let context = state.session.read().await.context(&user);
    Ok(Json(ContextResponse::new(user, context.as_ref())))
}

pub async fn clear_assessment_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    let user = UserId::new(user_id)?;
    state.session.write().await.clear_assessment(&user);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn select_handler(
    State(state): State<AppState>,
    Path((user_id, skill_id)): Path<(String, String)>,
) -> ApiResult<Json<SelectionResponse>> {
    let user = UserId::new(user_id)?;
    let skill = SkillId::new(skill_id)?;

    let mut session = state.session.write().await;
    let changed = session.select_skill(&user, skill);
    Ok(Json(selection(&session, &user, changed)))
}

pub async fn deselect_handler(
    State(state): State<AppState>,
    Path((user_id, skill_id)): Path<(String, String)>,
) -> ApiResult<Json<SelectionResponse>> {
    let user = UserId::new(user_id)?;
    let skill = SkillId::new(skill_id)?;

    let mut session = state.session.write().await;
    let changed = session.deselect_skill(&user, &skill);
    Ok(Json(selection(&session, &user, changed)))
}

fn selection(session: &skillpath_core::Session, user: &UserId, changed: bool) -> SelectionResponse {
    SelectionResponse {
        selected: session
            .context(user)
            .map(|c| c.selected().to_vec())
            .unwrap_or_default(),
        changed,
    }
}
