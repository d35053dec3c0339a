//! Session tracking for the HTTP transport.
//!
//! Sessions are a liveness/statistics convenience, not an auth mechanism:
//! ids are 128-bit random bearer tokens with no binding to client identity.
//! A supplied id that is unknown (or expired) is never echoed back; the
//! caller silently receives a fresh session instead.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// A single tracked session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: Instant,
    pub last_seen: Instant,
    pub request_count: u64,
}

/// Issues, validates, and expires per-client session identifiers.
pub struct SessionManager {
    sessions: DashMap<String, Session>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Validate or mint a session id for a request.
    ///
    /// A known id has its `last_seen`/`request_count` updated and is returned
    /// unchanged. An unknown or absent id falls through to creation.
    pub fn touch(&self, supplied: Option<&str>) -> String {
        self.touch_at(supplied, Instant::now())
    }

    /// Clock-injectable variant of [`touch`](Self::touch).
    pub fn touch_at(&self, supplied: Option<&str>, now: Instant) -> String {
        if let Some(id) = supplied {
            if let Some(mut session) = self.sessions.get_mut(id) {
                session.last_seen = now;
                session.request_count += 1;
                debug!("Using existing session: {}", id);
                return id.to_string();
            }
            debug!("Unknown session id supplied, minting a new one");
        }

        let id = Uuid::new_v4().to_string();
        self.sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                created_at: now,
                last_seen: now,
                request_count: 1,
            },
        );
        debug!("Created new session: {}", id);
        id
    }

    /// Remove every session idle longer than the configured timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Clock-injectable variant of [`sweep`](Self::sweep).
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now.duration_since(session.last_seen) <= self.idle_timeout);
        let removed = before - self.sessions.len();
        if removed > 0 {
            debug!("Expired {} session(s)", removed);
        }
        removed
    }

    /// Look up the request counter for a session.
    pub fn request_count(&self, id: &str) -> Option<u64> {
        self.sessions.get(id).map(|s| s.request_count)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every tracked session. Used during shutdown.
    pub fn clear(&self) {
        self.sessions.clear();
    }
}
