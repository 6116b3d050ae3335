//! Fixed-window request throttling keyed by client address.

use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Entries are pruned once the table grows past this many clients.
const PRUNE_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Per-client request counter over a fixed time window.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    clients: Arc<Mutex<HashMap<Option<IpAddr>, Window>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a hit for `client` at `now`; false when the client is over its budget.
    pub fn check_at(&self, client: Option<IpAddr>, now: Instant) -> bool {
        let mut clients = match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if clients.len() > PRUNE_THRESHOLD {
            let window = self.window;
            clients.retain(|_, entry| now.duration_since(entry.started) < window);
        }

        let entry = clients.entry(client).or_insert(Window {
            started: now,
            hits: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                hits: 0,
            };
        }

        if entry.hits >= self.max_requests {
            return false;
        }

        entry.hits += 1;
        true
    }

    pub fn check(&self, client: Option<IpAddr>) -> bool {
        self.check_at(client, Instant::now())
    }
}

/// Middleware rejecting requests over the limit with 429.
///
/// Requests without connection info share a single bucket.
pub async fn throttle(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if !limiter.check(client) {
        tracing::warn!(client = ?client, "rate limit exceeded");
        return AppError::too_many_requests("Too many requests, retry later")
            .into_response();
    }

    next.run(request).await
}
