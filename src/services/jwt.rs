use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;
use crate::error::AppError;
use crate::models::UserProfile;

/// Bearer token issuer/verifier.
///
/// Tokens are stateless: no server-side record of issued tokens exists, and
/// validity is fully determined by signature and expiry at verification
/// time. A single symmetric key and a single fixed algorithm (HS256).
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_seconds: i64,
}

/// Claims carried by a bearer token: the public profile shape plus the
/// registered subject/issued-at/expiry claims. Nothing else is embedded,
/// and nothing else is echoed back on verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileClaims {
    /// Subject (the profile's email).
    pub sub: String,
    pub email: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub organization: String,
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl JwtService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.signing_secret.as_bytes()),
            token_expiry_seconds: config.token_expiry_seconds,
        }
    }

    /// Sign a bearer token carrying the profile's public claims. The expiry
    /// horizon is fixed here; a fresh assertion cycle is the only renewal.
    pub fn issue(&self, profile: &UserProfile) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.token_expiry_seconds);
        let safe = profile.public();

        let claims = ProfileClaims {
            sub: safe.email.clone(),
            email: safe.email,
            name: safe.name,
            first_name: safe.first_name,
            last_name: safe.last_name,
            organization: safe.organization,
            role: safe.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to encode token: {}", e)))
    }

    /// Validate signature then expiry, mapping the claims back to the
    /// public profile shape.
    pub fn verify(&self, token: &str) -> Result<UserProfile, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Exact expiry boundary; the default 60s leeway would let expired
        // tokens linger.
        validation.leeway = 0;

        let token_data =
            decode::<ProfileClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                    _ => AppError::TokenInvalid,
                }
            })?;

        let claims = token_data.claims;
        Ok(UserProfile {
            email: claims.email,
            name: claims.name,
            first_name: claims.first_name,
            last_name: claims.last_name,
            organization: claims.organization,
            role: claims.role,
            session_index: None,
        })
    }

    pub fn token_expiry_seconds(&self) -> i64 {
        self.token_expiry_seconds
    }
}
