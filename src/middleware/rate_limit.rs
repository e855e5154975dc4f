// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client rate limiting.
//!
//! Each limiter keeps a token bucket per client. A bucket holds up to the
//! configured number of requests and refills evenly over the window, so a
//! client that stays under `max / window` is never refused.

use crate::config::RateLimitSettings;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Buckets kept before refilled ones are swept out.
const MAX_TRACKED_CLIENTS: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    name: &'static str,
    capacity: f64,
    refill_per_sec: f64,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new(name: &'static str, max_requests: u32, window: Duration) -> Self {
        let capacity = f64::from(max_requests.max(1));
        Self {
            name,
            capacity,
            refill_per_sec: capacity / window.as_secs_f64().max(1.0),
            buckets: DashMap::new(),
        }
    }

    /// Budget for the API as a whole.
    pub fn api(settings: &RateLimitSettings) -> Self {
        Self::new("api", settings.api_max_requests, settings.window)
    }

    /// Budget for login and register attempts.
    pub fn auth(settings: &RateLimitSettings) -> Self {
        Self::new("auth", settings.auth_max_attempts, settings.window)
    }

    /// Take a token for `key`. When the bucket is empty, returns the number
    /// of seconds until the next token.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        if self.buckets.len() >= MAX_TRACKED_CLIENTS && !self.buckets.contains_key(key) {
            self.sweep(now);
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        self.refill(&mut bucket, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let wait = (1.0 - bucket.tokens) / self.refill_per_sec;
            Err(wait.ceil().max(1.0) as u64)
        }
    }

    /// Return a token taken by `check`.
    pub fn refund(&self, key: &str) {
        if let Some(mut bucket) = self.buckets.get_mut(key) {
            bucket.tokens = (bucket.tokens + 1.0).min(self.capacity);
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
    }

    /// Drop buckets that have refilled completely; they carry no state.
    fn sweep(&self, now: Instant) {
        self.buckets.retain(|_, bucket| {
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens + elapsed * self.refill_per_sec < self.capacity
        });
        tracing::debug!(
            limiter = self.name,
            remaining = self.buckets.len(),
            "Swept rate limit buckets"
        );
    }
}

/// Key identifying the caller.
///
/// Uses the last `X-Forwarded-For` hop, which the front end appends; earlier
/// hops come from the client and can be forged. Falls back to the peer address.
pub fn client_key(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.rsplit(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// General per-client request budget.
pub async fn limit_api(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    if let Err(retry_after) = state.api_limiter.check(&key) {
        tracing::warn!(client = %key, limiter = "api", "Rate limit exceeded");
        return AppError::RateLimited(retry_after).into_response();
    }
    next.run(request).await
}

/// Budget for credential endpoints. Successful attempts are refunded, so
/// only failures count against the client.
pub async fn limit_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    if let Err(retry_after) = state.auth_limiter.check(&key) {
        tracing::warn!(client = %key, limiter = "auth", "Too many authentication attempts");
        return AppError::RateLimited(retry_after).into_response();
    }

    let response = next.run(request).await;
    if response.status().is_success() {
        state.auth_limiter.refund(&key);
    }
    response
}
