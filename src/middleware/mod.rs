pub mod auth;
pub mod security_headers;

pub use auth::{evidence_from_parts, resolve_user, AuthEvidence, CurrentUser, SESSION_COOKIE};
pub use security_headers::security_headers_middleware;
