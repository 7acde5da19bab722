pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::BrokerConfig;
use crate::error::AppError;
use crate::middleware::security_headers_middleware;
use crate::services::{AssertionService, CodeStore, JwtService, OrgCache, OrganizationFetcher, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub config: BrokerConfig,
    pub jwt: JwtService,
    pub codes: Arc<CodeStore>,
    pub sessions: Arc<SessionStore>,
    pub org_cache: Arc<OrgCache>,
    pub fetcher: Arc<dyn OrganizationFetcher>,
    pub saml: Arc<dyn AssertionService>,
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let cors_origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/saml/login", get(handlers::auth::saml_login))
        .route("/api/auth/saml/acs", post(handlers::auth::saml_acs))
        .route("/api/auth/saml/sls", get(handlers::auth::saml_sls))
        .route("/api/auth/metadata", get(handlers::auth::sp_metadata))
        .route("/api/auth/token", post(handlers::auth::exchange_token))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/dashboard/organizations",
            get(handlers::orgs::list_organizations),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .allow_credentials(true),
        );

    Ok(app)
}

/// Service health check. No dependencies to probe: every store is in
/// process memory.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
    }))
}
