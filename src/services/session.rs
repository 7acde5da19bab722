use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::UserProfile;

/// How long a stashed login round trip may take before its relay state is
/// discarded.
const LOGIN_STATE_TTL: Duration = Duration::from_secs(600);

struct SessionEntry {
    profile: UserProfile,
    expires_at: Instant,
}

/// Pending login round trip, keyed by relay state: remembers the outbound
/// request id (for response validation) and where the frontend wanted to
/// land afterwards.
pub struct LoginState {
    pub request_id: String,
    pub return_to: Option<String>,
    expires_at: Instant,
}

/// Server-side session fallback for browser callers that do not hold a
/// bearer token. Memory-only and process-lifetime, like the code store;
/// expired entries are dropped lazily on access.
pub struct SessionStore {
    sessions: DashMap<Uuid, SessionEntry>,
    pending: DashMap<String, LoginState>,
    session_ttl: Duration,
}

impl SessionStore {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            pending: DashMap::new(),
            session_ttl,
        }
    }

    pub fn create_session(&self, profile: UserProfile) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(
            id,
            SessionEntry {
                profile,
                expires_at: Instant::now() + self.session_ttl,
            },
        );
        id
    }

    /// Look up a live session's profile. Expired sessions are removed on
    /// the way out and read as absent.
    pub fn get_session(&self, id: Uuid) -> Option<UserProfile> {
        let expired = match self.sessions.get(&id) {
            Some(entry) => {
                if Instant::now() <= entry.expires_at {
                    return Some(entry.profile.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.sessions.remove(&id);
        }
        None
    }

    pub fn delete_session(&self, id: Uuid) -> Option<UserProfile> {
        self.sessions.remove(&id).map(|(_, entry)| entry.profile)
    }

    pub fn stash_login_state(&self, relay_state: String, request_id: String, return_to: Option<String>) {
        let now = Instant::now();
        self.pending.retain(|_, state| now <= state.expires_at);
        self.pending.insert(
            relay_state,
            LoginState {
                request_id,
                return_to,
                expires_at: now + LOGIN_STATE_TTL,
            },
        );
    }

    /// Consume the pending state for a relay value, if still live.
    pub fn take_login_state(&self, relay_state: &str) -> Option<LoginState> {
        let (_, state) = self.pending.remove(relay_state)?;
        if Instant::now() > state.expires_at {
            return None;
        }
        Some(state)
    }
}
