//! # Middleware Module
//!
//! Rate limiting and the per-user in-flight guard for the SkillPath HTTP API.
//!
//! ## Rate limiting
//!
//! One global limiter (`SKILLPATH_RATE_LIMIT` requests per second, default
//! 100, 0 disables). Exceeding it answers 429.
//!
//! ## In-flight guard
//!
//! At most one mutating request (proficiency update or assessment) per user
//! runs at a time. A second one answers 409 while the first is outstanding.

use super::types::ApiError;
use crate::config::DEFAULT_RATE_LIMIT;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use skillpath_core::UserId;
use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};

const DEFAULT_RPS: NonZeroU32 = match NonZeroU32::new(DEFAULT_RATE_LIMIT) {
    Some(rps) => rps,
    None => NonZeroU32::MIN,
};

// =============================================================================
// RATE LIMITER
// =============================================================================

/// Global rate limiter type alias.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a new global rate limiter. Zero falls back to the default rate.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    let quota = Quota::per_second(rps);
    Arc::new(RateLimiter::direct(quota))
}

/// Rate limiting middleware.
///
/// Returns 429 Too Many Requests if the limit is exceeded.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!("Rate limit exceeded");
            Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
        }
    }
}

// =============================================================================
// IN-FLIGHT GUARD
// =============================================================================

/// Users with a mutating request outstanding.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<Mutex<BTreeSet<UserId>>>);

impl InFlight {
    /// Mark `user` busy, or fail with 409 if already busy.
    ///
    /// The mark is released when the returned guard drops.
    pub fn begin(&self, user: &UserId) -> Result<InFlightGuard, ApiError> {
        let mut busy = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !busy.insert(user.clone()) {
            tracing::warn!(user = %user, "rejected concurrent request");
            return Err(ApiError::conflict(user));
        }
        Ok(InFlightGuard {
            set: Arc::clone(&self.0),
            user: user.clone(),
        })
    }

    /// Whether `user` has a request outstanding.
    #[must_use]
    pub fn is_busy(&self, user: &UserId) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(user)
    }
}

/// Releases the user's in-flight mark on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    set: Arc<Mutex<BTreeSet<UserId>>>,
    user: UserId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user);
    }
}

// =============================================================================
// TESTS
// =============================================================================
