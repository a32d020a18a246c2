//! Middleware for the `/v1` routes: a service-wide request quota and
//! per-request logging.

use crate::error::RingrError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Instant};
use tracing::{debug, info, warn};

/// One quota shared by every caller; Ringr has a single shared secret, so
/// there is no caller identity to key on.
pub type RequestLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Quota applied when `RATE_LIMIT__GLOBAL_PER_MINUTE` is 0.
const FALLBACK_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(60) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

#[derive(Clone)]
pub struct RateLimitState {
    pub global: Arc<RequestLimiter>,
}

impl RateLimitState {
    /// Allow `requests_per_minute` requests, bursting up to the full minute's quota.
    pub fn new(requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or_else(|| {
            warn!(
                "Rate limit of 0 requests per minute ignored, using {}",
                FALLBACK_PER_MINUTE
            );
            FALLBACK_PER_MINUTE
        });

        Self {
            global: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        }
    }

    /// Quota high enough that tests never hit it.
    pub fn permissive() -> Self {
        Self::new(1000)
    }

    /// Take one request from the quota.
    pub fn try_acquire(&self) -> Result<(), RingrError> {
        self.global
            .check()
            .map_err(|_| RingrError::RateLimitExceeded)
    }
}

/// Answer 429 envelopes once the quota is spent.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RingrError> {
    if let Err(e) = rate_limit.try_acquire() {
        warn!(uri = %request.uri(), "Request rejected: quota exhausted");
        return Err(e);
    }

    Ok(next.run(request).await)
}

/// Log every request with its outcome. Handler failures come back as
/// envelopes, so the status is the only failure signal here.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_server_error() {
        warn!(%method, %uri, %status, elapsed_ms, "Request failed");
    } else if status.is_client_error() {
        info!(%method, %uri, %status, elapsed_ms, "Request rejected");
    } else {
        debug!(%method, %uri, %status, elapsed_ms, "Request handled");
    }

    response
}
