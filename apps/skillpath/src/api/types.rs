//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Reads that degrade on a store failure still answer 200 with an empty
//! payload and the failure in `error`, so a client can show both.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use skillpath_core::{
    AssessmentResult, ErrorKind, Skill, SkillCategory, SkillError, SkillId, UserContext, UserId,
    UserSkill,
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error code for a rejected concurrent request.
pub const CONFLICT_CODE: &str = "CONFLICT";

/// Error body: `{ "message", "code", "details"? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&SkillError> for ErrorResponse {
    fn from(error: &SkillError) -> Self {
        let details = match error {
            SkillError::DocumentNotFound { collection, id } => Some(format!("{collection}/{id}")),
            _ => None,
        };
        Self {
            message: error.to_string(),
            code: error.code().to_string(),
            details,
        }
    }
}

/// An error with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    /// Another mutating request for the same user is still running.
    #[must_use]
    pub fn conflict(user: &UserId) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            body: ErrorResponse {
                message: format!("A request for user {user} is already in progress"),
                code: CONFLICT_CODE.to_string(),
                details: None,
            },
        }
    }
}

impl From<SkillError> for ApiError {
    fn from(error: SkillError) -> Self {
        let status = match (&error, error.kind()) {
            (SkillError::DocumentNotFound { .. }, _) => StatusCode::NOT_FOUND,
            (_, ErrorKind::Validation) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::DataAccess) => StatusCode::SERVICE_UNAVAILABLE,
            (_, ErrorKind::Unknown) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ErrorResponse::from(&error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn surfaced(error: Option<SkillError>) -> Option<ErrorResponse> {
    error.as_ref().map(ErrorResponse::from)
}

// =============================================================================
// CATALOG
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsResponse {
    pub skills: Vec<Skill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<SkillCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// One skill with its related skills resolved against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDetailResponse {
    pub skill: Skill,
    pub related: Vec<Skill>,
}

impl SkillsResponse {
    #[must_use]
    pub fn new(skills: Vec<Skill>, error: Option<SkillError>) -> Self {
        Self {
            skills,
            error: surfaced(error),
        }
    }
}

impl CategoriesResponse {
    #[must_use]
    pub fn new(categories: Vec<SkillCategory>, error: Option<SkillError>) -> Self {
        Self {
            categories,
            error: surfaced(error),
        }
    }
}

// =============================================================================
// USER SKILLS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSkillsResponse {
    pub user_skills: Vec<UserSkill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl UserSkillsResponse {
    #[must_use]
    pub fn new(user_skills: Vec<UserSkill>, error: Option<SkillError>) -> Self {
        Self {
            user_skills,
            error: surfaced(error),
        }
    }
}

/// Body of `PUT /users/{user_id}/skills/{skill_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProficiencyRequest {
    pub proficiency: i64,
}

// =============================================================================
// ASSESSMENTS
// =============================================================================

/// Body of `POST /users/{user_id}/assessments`.
///
/// Without `skill_ids` the user's current selection is assessed. An explicit
/// empty list is a validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessRequest {
    #[serde(default)]
    pub skill_ids: Option<Vec<String>>,
}

/// A computed assessment. `persisted` is false for fallback results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub assessment: AssessmentResult,
    pub persisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl AssessmentResponse {
    #[must_use]
    pub fn new(assessment: AssessmentResult, error: Option<SkillError>) -> Self {
        Self {
            persisted: assessment.is_persisted(),
            assessment,
            error: surfaced(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub assessments: Vec<AssessmentResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl HistoryResponse {
    #[must_use]
    pub fn new(assessments: Vec<AssessmentResult>, error: Option<SkillError>) -> Self {
        Self {
            assessments,
            error: surfaced(error),
        }
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Volatile per-user state held by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResponse {
    pub user_id: UserId,
    pub selected: Vec<SkillId>,
    pub cached: Vec<UserSkill>,
    pub assessment: Option<AssessmentResult>,
    pub last_error: Option<ErrorResponse>,
}

impl ContextResponse {
    #[must_use]
    pub fn new(user_id: UserId, context: Option<&UserContext>) -> Self {
        let Some(context) = context else {
            return Self {
                user_id,
                selected: Vec::new(),
                cached: Vec::new(),
                assessment: None,
                last_error: None,
            };
        };
        Self {
            user_id,
            selected: context.selected().to_vec(),
            cached: context.cached().cloned().collect(),
            assessment: context.assessment().cloned(),
            last_error: context.last_error().map(ErrorResponse::from),
        }
    }
}

/// Selection after a select/deselect. `changed` is false when it was a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResponse {
    pub selected: Vec<SkillId>,
    pub changed: bool,
}
