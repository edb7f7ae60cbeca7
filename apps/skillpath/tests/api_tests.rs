//! Integration tests for the SkillPath HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use chrono::Utc;
use serde_json::json;
use skillpath::api::{
    AppState, AssessmentResponse, CategoriesResponse, ContextResponse, ErrorResponse,
    HealthResponse, HistoryResponse, SelectionResponse, SkillDetailResponse, SkillsResponse,
    UserSkillsResponse, create_router, create_router_with,
};
use skillpath::config::{CorsOrigins, ENV_API_KEY, ServerSettings};
use skillpath_core::{Session, Snapshot, UserId, UserSkill, import_snapshot};
use std::sync::Mutex;

/// Mutex to serialize tests that modify env vars.
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn open_settings() -> ServerSettings {
    ServerSettings {
        cors_origins: CorsOrigins::Localhost,
        rate_limit: 0,
        api_key: None,
    }
}

fn seeded_session() -> Session {
    let mut session = Session::new();
    import_snapshot(session.store_mut(), Snapshot::seed(), Utc::now()).unwrap();
    session
}

/// Create a test server over the given state with auth and rate limit off.
fn server_for(state: AppState) -> TestServer {
    TestServer::new(create_router_with(state, &open_settings())).unwrap()
}

fn create_test_server() -> TestServer {
    server_for(AppState::new(Session::new()))
}

fn create_seeded_test_server() -> TestServer {
    server_for(AppState::new(seeded_session()))
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// CATALOG ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_skills_empty_store() {
    let server = create_test_server();

    let response = server.get("/skills").await;

    response.assert_status_ok();
    let body: SkillsResponse = response.json();
    assert!(body.skills.is_empty());
    assert!(body.error.is_none());
}

#[tokio::test]
async fn test_skills_and_categories_seeded() {
    let server = create_seeded_test_server();

    let skills: SkillsResponse = server.get("/skills").await.json();
    let names: Vec<_> = skills.skills.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["JavaScript", "React", "Node.js"]);

    let categories: CategoriesResponse = server.get("/categories").await.json();
    assert_eq!(categories.categories.len(), 3);
}

#[tokio::test]
async fn test_skill_detail_resolves_related() {
    let server = create_seeded_test_server();

    let response = server.get("/skills/2").await;

    response.assert_status_ok();
    let detail: SkillDetailResponse = response.json();
    assert_eq!(detail.skill.name, "React");
    let related: Vec<_> = detail.related.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(related, vec!["JavaScript"]);
}

#[tokio::test]
async fn test_skill_detail_not_found() {
    let server = create_seeded_test_server();

    let response = server.get("/skills/99").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "NOT_FOUND");
    assert_eq!(error.details.as_deref(), Some("skills/99"));
}

// =============================================================================
// PROFICIENCY ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_user_skills_seeded() {
    let server = create_seeded_test_server();

    let body: UserSkillsResponse = server.get("/users/1/skills").await.json();

    let mut values: Vec<_> = body
        .user_skills
        .iter()
        .map(|r| r.proficiency.value())
        .collect();
    values.sort_unstable();
    assert_eq!(values, vec![65, 75, 85]);
}

#[tokio::test]
async fn test_update_creates_then_updates_one_record() {
    let server = create_test_server();

    let created: UserSkill = server
        .put("/users/7/skills/3")
        .json(&json!({ "proficiency": 40 }))
        .await
        .json();
    assert_eq!(created.proficiency.value(), 40);
    assert_eq!(created.confidence.value(), 0.8);

    let updated: UserSkill = server
        .put("/users/7/skills/3")
        .json(&json!({ "proficiency": 95 }))
        .await
        .json();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.proficiency.value(), 95);

    let body: UserSkillsResponse = server.get("/users/7/skills").await.json();
    assert_eq!(body.user_skills.len(), 1);
}

#[tokio::test]
async fn test_update_out_of_range_is_validation_error() {
    let server = create_test_server();

    let response = server
        .put("/users/7/skills/3")
        .json(&json!({ "proficiency": 101 }))
        .await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_concurrent_update_for_same_user_conflicts() {
    let state = AppState::new(Session::new());
    let server = server_for(state.clone());

    let user = UserId::new("7").unwrap();
    let guard = state.in_flight.begin(&user).unwrap();

    let response = server
        .put("/users/7/skills/3")
        .json(&json!({ "proficiency": 50 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "CONFLICT");

    // Other users are unaffected.
    server
        .put("/users/8/skills/3")
        .json(&json!({ "proficiency": 50 }))
        .await
        .assert_status_ok();

    drop(guard);
    server
        .put("/users/7/skills/3")
        .json(&json!({ "proficiency": 50 }))
        .await
        .assert_status_ok();
}

// =============================================================================
// ASSESSMENT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_assess_seeded_user() {
    let server = create_seeded_test_server();

    let response = server
        .post("/users/1/assessments")
        .json(&json!({ "skill_ids": ["1", "2", "3"] }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: AssessmentResponse = response.json();
    assert!(body.persisted);
    assert!(body.error.is_none());
    assert_eq!(body.assessment.overall_score, 75);
    let strengths: Vec<_> = body.assessment.strengths.iter().map(|s| s.as_str()).collect();
    assert_eq!(strengths, vec!["1"]);
    assert!(body.assessment.weaknesses.is_empty());
    assert_eq!(
        body.assessment.recommendations,
        vec!["Practice more advanced topics", "Consider mentoring others"]
    );

    let history: HistoryResponse = server.get("/users/1/assessments").await.json();
    assert_eq!(history.assessments.len(), 1);
    assert_eq!(history.assessments[0].id, body.assessment.id);
}

#[tokio::test]
async fn test_assess_empty_list_is_validation_error() {
    let server = create_seeded_test_server();

    let response = server
        .post("/users/1/assessments")
        .json(&json!({ "skill_ids": [] }))
        .await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert_eq!(error.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_assess_without_records_is_validation_error() {
    let server = create_seeded_test_server();

    let response = server
        .post("/users/2/assessments")
        .json(&json!({ "skill_ids": ["1"] }))
        .await;

    response.assert_status_bad_request();
    let history: HistoryResponse = server.get("/users/2/assessments").await.json();
    assert!(history.assessments.is_empty());
}

#[tokio::test]
async fn test_assess_uses_selection_when_ids_omitted() {
    let server = create_seeded_test_server();

    let selection: SelectionResponse = server.put("/users/1/selection/3").await.json();
    assert!(selection.changed);
    let again: SelectionResponse = server.put("/users/1/selection/3").await.json();
    assert!(!again.changed);

    let response = server.post("/users/1/assessments").json(&json!({})).await;

    response.assert_status(StatusCode::CREATED);
    let body: AssessmentResponse = response.json();
    assert_eq!(body.assessment.overall_score, 65);
    assert_eq!(
        body.assessment.recommendations,
        vec!["Practice more advanced topics"]
    );
}

#[tokio::test]
async fn test_assess_with_empty_selection_is_validation_error() {
    let server = create_seeded_test_server();

    let response = server.post("/users/1/assessments").json(&json!({})).await;

    response.assert_status_bad_request();
}

// =============================================================================
// CONTEXT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_context_tracks_selection_and_assessment() {
    let server = create_seeded_test_server();

    let empty: ContextResponse = server.get("/users/1/context").await.json();
    assert!(empty.selected.is_empty());
    assert!(empty.assessment.is_none());

    server.put("/users/1/selection/1").await.assert_status_ok();
    server.put("/users/1/selection/2").await.assert_status_ok();
    server
        .post("/users/1/assessments")
        .json(&json!({}))
        .await
        .assert_status(StatusCode::CREATED);

    let context: ContextResponse = server.get("/users/1/context").await.json();
    let selected: Vec<_> = context.selected.iter().map(|s| s.as_str()).collect();
    assert_eq!(selected, vec!["1", "2"]);
    assert_eq!(context.assessment.as_ref().map(|a| a.overall_score), Some(80));
    assert_eq!(context.cached.len(), 2);

    server
        .delete("/users/1/context/assessment")
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let cleared: ContextResponse = server.get("/users/1/context").await.json();
    assert!(cleared.assessment.is_none());
    assert_eq!(cleared.selected.len(), 2);

    let deselected: SelectionResponse = server.delete("/users/1/selection/1").await.json();
    assert!(deselected.changed);
    let ids: Vec<_> = deselected.selected.iter().map(|s| s.as_str()).collect();
    assert_eq!(ids, vec!["2"]);
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

fn create_auth_test_server(api_key: &str) -> TestServer {
    let settings = ServerSettings {
        api_key: Some(api_key.to_string()),
        ..open_settings()
    };
    TestServer::new(create_router_with(
        AppState::new(Session::new()),
        &settings,
    ))
    .unwrap()
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/skills")
        .add_header(
            header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let api_key = "test-raw-key-67890";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/skills")
        .add_header(header::AUTHORIZATION, api_key.parse::<HeaderValue>().unwrap())
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/skills")
        .add_header(
            header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server.get("/users/1/skills").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let server = create_auth_test_server("correct-key");

    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_auth_key_from_environment() {
    let _guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests that touch the environment run under ENV_TEST_MUTEX.
    unsafe { std::env::set_var(ENV_API_KEY, "env-key") };
    let router = create_router(AppState::new(Session::new()));
    // SAFETY: as above.
    unsafe { std::env::remove_var(ENV_API_KEY) };

    let server = TestServer::new(router).unwrap();
    server
        .get("/skills")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/skills")
        .add_header(
            header::AUTHORIZATION,
            "Bearer env-key".parse::<HeaderValue>().unwrap(),
        )
        .await
        .assert_status_ok();
}
