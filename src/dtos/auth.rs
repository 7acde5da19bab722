use serde::{Deserialize, Serialize};

use crate::models::UserProfile;

/// Query params for SSO login initiation.
#[derive(Debug, Deserialize)]
pub struct LoginParams {
    /// Where the frontend should land after the login round trip.
    pub return_to: Option<String>,
}

/// Form posted by the IdP to the assertion consumer service.
#[derive(Debug, Deserialize)]
pub struct AcsForm {
    #[serde(rename = "SAMLResponse")]
    pub saml_response: String,
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

/// Request to exchange a one-time code for a bearer token.
#[derive(Debug, Deserialize)]
pub struct ExchangeCodeRequest {
    pub code: String,
}

/// Response after a successful code exchange. The client holds the token
/// and sends `Authorization: Bearer` on subsequent calls; no cookies needed.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    /// Request federation single logout in addition to clearing the session.
    #[serde(default)]
    pub saml_logout: bool,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}
