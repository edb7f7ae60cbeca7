//! # SkillPath HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /skills` - All skill definitions
//! - `GET /skills/{skill_id}` - One skill with related skills
//! - `GET /categories` - All skill categories
//! - `GET /users/{user_id}/skills` - A user's proficiency records
//! - `PUT /users/{user_id}/skills/{skill_id}` - Set a proficiency
//! - `POST /users/{user_id}/assessments` - Assess selected skills
//! - `GET /users/{user_id}/assessments` - Assessment history
//! - `GET /users/{user_id}/context` - Volatile per-user state
//! - `DELETE /users/{user_id}/context/assessment` - Clear the last assessment
//! - `PUT|DELETE /users/{user_id}/selection/{skill_id}` - Edit the selection
//!
//! ## Security Configuration
//!
//! See [`crate::config`]: CORS origins, rate limit and API key come from the
//! environment (`SKILLPATH_CORS_ORIGINS`, `SKILLPATH_RATE_LIMIT`,
//! `SKILLPATH_API_KEY`) or the config file.

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{ApiKey, api_key_auth_middleware};
pub use middleware::{
    GlobalRateLimiter, InFlight, InFlightGuard, create_rate_limiter, rate_limit_middleware,
};
pub use types::{
    ApiError, AssessRequest, AssessmentResponse, CONFLICT_CODE, CategoriesResponse,
    ContextResponse, ErrorResponse, HealthResponse, HistoryResponse, ProficiencyRequest,
    SelectionResponse, SkillDetailResponse, SkillsResponse, UserSkillsResponse,
};

use crate::config::{CorsOrigins, ServerSettings};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use skillpath_core::{Session, SkillError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (2 MB).
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the session.
#[derive(Clone)]
pub struct AppState {
    /// The session containing the store and per-user context.
    pub session: Arc<RwLock<Session>>,
    /// Users with a mutating request outstanding.
    pub in_flight: InFlight,
}

impl AppState {
    /// Create new app state with a session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            in_flight: InFlight::default(),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer.
///
/// The default is restrictive (localhost only). `*` allows all origins and
/// should only be used for development.
fn build_cors_layer(origins: &CorsOrigins) -> CorsLayer {
    match origins {
        CorsOrigins::Any => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        CorsOrigins::List(list) => {
            let allowed_origins: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", origin);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        CorsOrigins::Localhost => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the router with security settings read from the environment.
pub fn create_router(state: AppState) -> Router {
    create_router_with(state, &ServerSettings::from_env())
}

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting - if enabled
/// 5. Authentication - if a key is configured
pub fn create_router_with(state: AppState, settings: &ServerSettings) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/skills", get(handlers::skills_handler))
        .route("/skills/{skill_id}", get(handlers::skill_handler))
        .route("/categories", get(handlers::categories_handler))
        .route("/users/{user_id}/skills", get(handlers::user_skills_handler))
        .route(
            "/users/{user_id}/skills/{skill_id}",
            put(handlers::update_proficiency_handler),
        )
        .route(
            "/users/{user_id}/assessments",
            post(handlers::assess_handler).get(handlers::history_handler),
        )
        .route("/users/{user_id}/context", get(handlers::context_handler))
        .route(
            "/users/{user_id}/context/assessment",
            delete(handlers::clear_assessment_handler),
        )
        .route(
            "/users/{user_id}/selection/{skill_id}",
            put(handlers::select_handler).delete(handlers::deselect_handler),
        );

    match &settings.api_key {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                ApiKey::from(key.as_str()),
                auth::api_key_auth_middleware,
            ));
        }
        None => {
            tracing::warn!(
                "API key authentication DISABLED - all endpoints are publicly accessible! \
                 Set SKILLPATH_API_KEY to enable authentication."
            );
        }
    }

    if settings.rate_limit > 0 {
        tracing::info!(
            "Rate limiting enabled: {} requests/second",
            settings.rate_limit
        );
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(settings.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&settings.cors_origins))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(
    addr: &str,
    session: Session,
    settings: &ServerSettings,
) -> Result<(), SkillError> {
    let router = create_router_with(AppState::new(session), settings);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SkillError::Unknown(format!("Bind failed: {}", e)))?;

    tracing::info!("SkillPath HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| SkillError::Unknown(format!("Server error: {}", e)))
}
