use serde::{Deserialize, Serialize};

/// Canonical user profile extracted from a validated SSO assertion.
///
/// Immutable once constructed, never contains secrets, and travels by value:
/// it is embedded into one-time codes and bearer tokens so it survives
/// independently of any server-side session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity key.
    pub email: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub organization: String,
    pub role: String,
    /// Federation session index, kept for single logout only. Never exposed
    /// in API responses or token claims.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_index: Option<String>,
}

impl UserProfile {
    /// The shape safe to send to clients and embed in token claims: the
    /// public profile fields with federation metadata stripped.
    pub fn public(&self) -> UserProfile {
        UserProfile {
            session_index: None,
            ..self.clone()
        }
    }
}
