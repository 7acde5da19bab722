use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect},
    Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::config::Environment;
use crate::dtos::auth::{
    AcsForm, ExchangeCodeRequest, LoginParams, LogoutRequest, LogoutResponse, TokenResponse,
};
use crate::error::AppError;
use crate::middleware::{CurrentUser, SESSION_COOKIE};
use crate::models::UserProfile;
use crate::services::normalize_profile;
use crate::AppState;

/// GET /api/auth/saml/login — kick off the SSO round trip by redirecting
/// the browser to the IdP with a fresh authentication request.
pub async fn saml_login(
    State(state): State<AppState>,
    Query(params): Query<LoginParams>,
) -> Result<Redirect, AppError> {
    let relay_state = Uuid::new_v4().to_string();
    let (url, request_id) = state.saml.login_redirect(&relay_state)?;

    state
        .sessions
        .stash_login_state(relay_state, request_id, params.return_to);

    tracing::debug!("Redirecting to IdP for login");
    Ok(Redirect::to(&url))
}

/// POST /api/auth/saml/acs — consume the IdP's response: validate the
/// assertion, establish a session, and bounce the browser back to the
/// frontend with a one-time code.
pub async fn saml_acs(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AcsForm>,
) -> Result<(CookieJar, Redirect), AppError> {
    let login_state = form
        .relay_state
        .as_deref()
        .and_then(|rs| state.sessions.take_login_state(rs));
    let expected_request_id = login_state.as_ref().map(|s| s.request_id.as_str());

    let outcome = state
        .saml
        .validate_response(&form.saml_response, expected_request_id)?;

    let profile = normalize_profile(&outcome.attributes, &outcome.subject, outcome.session_index);
    tracing::info!(subject = %profile.email, "Login succeeded");

    let session_id = state.sessions.create_session(profile.clone());
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.environment == Environment::Prod)
        .build();

    let code = state.codes.issue(profile);

    let mut callback = format!(
        "{}/auth/callback?code={}",
        state.config.security.frontend_url, code
    );
    if let Some(return_to) = login_state.and_then(|s| s.return_to) {
        callback.push_str("&return_to=");
        callback.push_str(&urlencoding::encode(&return_to));
    }

    Ok((jar.add(cookie), Redirect::to(&callback)))
}

/// POST /api/auth/token — redeem a one-time code for a bearer token.
pub async fn exchange_token(
    State(state): State<AppState>,
    Json(req): Json<ExchangeCodeRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let profile = state.codes.redeem(&req.code)?;
    let access_token = state.jwt.issue(&profile)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.token_expiry_seconds(),
        user: profile.public(),
    }))
}

/// GET /api/auth/me — identity of the calling user.
pub async fn me(CurrentUser(profile): CurrentUser) -> Json<UserProfile> {
    Json(profile.public())
}

/// POST /api/auth/logout — drop the server-side session and clear its
/// cookie. When federation logout is requested and the login carried a
/// session index, also hand back the IdP logout URL for the frontend to
/// follow.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<LogoutRequest>>,
) -> Result<(CookieJar, Json<LogoutResponse>), AppError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();

    let profile = session_id_from_jar(&jar).and_then(|id| state.sessions.delete_session(id));

    let redirect_url = match (&profile, req.saml_logout) {
        (Some(p), true) => state.saml.logout_redirect(
            &p.email,
            p.session_index.as_deref(),
            &state.config.security.frontend_url,
        )?,
        _ => None,
    };

    if let Some(p) = &profile {
        tracing::info!(subject = %p.email, federated = req.saml_logout, "Logout");
    }

    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());

    Ok((
        jar,
        Json(LogoutResponse {
            message: "Logged out".to_string(),
            redirect_url,
        }),
    ))
}

/// GET /api/auth/saml/sls — IdP-initiated single logout landing. Drops the
/// session and sends the browser to the frontend login page.
pub async fn saml_sls(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(id) = session_id_from_jar(&jar) {
        state.sessions.delete_session(id);
    }

    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    let login_url = format!("{}/login", state.config.security.frontend_url);
    (jar, Redirect::to(&login_url))
}

/// GET /api/auth/metadata — SP metadata document for IdP configuration.
pub async fn sp_metadata(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/xml")],
        state.saml.sp_metadata(),
    )
}

fn session_id_from_jar(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<Uuid>().ok())
}
