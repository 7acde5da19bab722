use serde::Deserialize;
use std::env;

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub port: u16,
    pub security: SecurityConfig,
    pub token: TokenConfig,
    pub saml: SamlConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    /// Where the browser client lives; login and logout round trips land here.
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Symmetric signing secret for bearer tokens. HS256 only.
    pub signing_secret: String,
    /// Bearer token lifetime; fixed at issuance, not renewable.
    pub token_expiry_seconds: i64,
    /// One-time code lifetime; only bridges a single redirect round trip.
    pub code_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamlConfig {
    pub idp_entity_id: String,
    pub idp_sso_url: String,
    pub idp_slo_url: Option<String>,
    /// IdP X.509 certificate for signature verification (PEM format).
    pub idp_certificate: String,
    pub sp_entity_id: String,
    pub sp_acs_url: String,
    pub name_id_format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Base for constructed organization links when the upstream record
    /// carries no URL of its own.
    pub org_link_base: String,
    /// Credential for the user-view organization listing.
    pub user_api_key: Option<String>,
    /// Credential for the service-view organization listing.
    pub service_api_key: Option<String>,
    pub cache_ttl_seconds: u64,
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
}

impl BrokerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = BrokerConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("broker-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            port: get_env("PORT", Some("5001"), is_prod)?
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                })?,
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
                frontend_url: get_env("FRONTEND_URL", Some("http://localhost:3000"), is_prod)?,
            },
            token: TokenConfig {
                signing_secret: get_env("SIGNING_SECRET", Some("dev-secret"), is_prod)?,
                token_expiry_seconds: get_env("TOKEN_EXPIRY_SECONDS", Some("43200"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
                code_ttl_seconds: get_env("CODE_TTL_SECONDS", Some("60"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            saml: SamlConfig {
                idp_entity_id: get_env("IDP_ENTITY_ID", None, is_prod)?,
                idp_sso_url: get_env("IDP_SSO_URL", None, is_prod)?,
                idp_slo_url: env::var("IDP_SLO_URL").ok(),
                idp_certificate: get_env("IDP_X509_CERT", None, is_prod)?,
                sp_entity_id: get_env("SP_ENTITY_ID", None, is_prod)?,
                sp_acs_url: get_env("SP_ACS_URL", None, is_prod)?,
                name_id_format: env::var("SP_NAME_ID_FORMAT").ok(),
            },
            upstream: UpstreamConfig {
                base_url: get_env(
                    "DASHBOARD_API_BASE_URL",
                    Some("https://api.meraki.com/api/v1"),
                    is_prod,
                )?,
                org_link_base: get_env(
                    "DASHBOARD_ORG_LINK_BASE",
                    Some("https://dashboard.meraki.com/o"),
                    is_prod,
                )?,
                user_api_key: env::var("DASHBOARD_USER_API_KEY").ok(),
                service_api_key: env::var("DASHBOARD_SERVICE_API_KEY").ok(),
                cache_ttl_seconds: get_env("ORG_CACHE_TTL_SECONDS", Some("3600"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
                request_timeout_seconds: get_env("UPSTREAM_TIMEOUT_SECONDS", Some("10"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
                max_retries: get_env("UPSTREAM_MAX_RETRIES", Some("2"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.token.token_expiry_seconds <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_EXPIRY_SECONDS must be positive"
            )));
        }

        if self.token.code_ttl_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "CODE_TTL_SECONDS must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.token.signing_secret == "dev-secret" {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "SIGNING_SECRET must be set to a non-default value in production"
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
