use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::UserProfile;
use crate::services::{JwtService, SessionStore};
use crate::AppState;

/// Name of the server-side session cookie set after a successful login.
pub const SESSION_COOKIE: &str = "broker_session";

/// What a request presented as proof of identity. At most one kind counts:
/// a bearer token, when present, is the whole story.
#[derive(Debug)]
pub enum AuthEvidence {
    Bearer(String),
    Session(Uuid),
    None,
}

/// Inspect request headers for credentials. The Authorization header wins
/// outright; the session cookie is only looked at when no bearer token is
/// attached.
pub fn evidence_from_parts(parts: &Parts) -> AuthEvidence {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if let Some(token) = bearer {
        return AuthEvidence::Bearer(token.to_string());
    }

    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(id) = cookie.value().parse::<Uuid>() {
            return AuthEvidence::Session(id);
        }
    }

    AuthEvidence::None
}

/// Resolve the calling user from presented evidence.
///
/// A bearer token is authoritative: verification failures surface as-is and
/// never fall back to the session, so a client holding a bad token learns
/// that instead of silently riding a stale cookie.
pub fn resolve_user(
    jwt: &JwtService,
    sessions: &SessionStore,
    evidence: AuthEvidence,
) -> Result<UserProfile, AppError> {
    match evidence {
        AuthEvidence::Bearer(token) => jwt.verify(&token),
        AuthEvidence::Session(id) => sessions.get_session(id).ok_or(AppError::Unauthenticated),
        AuthEvidence::None => Err(AppError::Unauthenticated),
    }
}

/// Extractor for handlers that require an authenticated caller.
pub struct CurrentUser(pub UserProfile);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let evidence = evidence_from_parts(parts);
        let profile = resolve_user(&state.jwt, &state.sessions, evidence)?;
        Ok(CurrentUser(profile))
    }
}
