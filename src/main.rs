use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use broker_service::{
    build_router,
    config::BrokerConfig,
    observability::init_tracing,
    services::{CodeStore, DashboardFetcher, JwtService, OrgCache, SamlGateway, SessionStore},
    AppState,
};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), broker_service::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = BrokerConfig::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity broker"
    );

    let jwt = JwtService::new(&config.token);
    let codes = Arc::new(CodeStore::new(Duration::from_secs(
        config.token.code_ttl_seconds,
    )));
    // Sessions live as long as a bearer token would.
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(
        config.token.token_expiry_seconds.unsigned_abs(),
    )));
    let org_cache = Arc::new(OrgCache::new(
        Duration::from_secs(config.upstream.cache_ttl_seconds),
        config.upstream.org_link_base.clone(),
    ));
    let fetcher = Arc::new(DashboardFetcher::new(&config.upstream)?);
    let saml = Arc::new(SamlGateway::new(config.saml.clone()));
    tracing::info!("Services initialized");

    let state = AppState {
        config: config.clone(),
        jwt,
        codes,
        sessions,
        org_cache,
        fetcher,
        saml,
    };

    let app = build_router(state)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
