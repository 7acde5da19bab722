//! Shared setup for broker integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{response::Response, Router};
use broker_service::{
    build_router,
    config::{
        BrokerConfig, Environment, SamlConfig, SecurityConfig, TokenConfig, UpstreamConfig,
    },
    models::RawOrganization,
    services::{
        AssertionOutcome, AssertionService, CodeStore, JwtService, MockAssertionService, OrgCache,
        OrganizationFetcher, SessionStore,
    },
    AppState,
};
use http_body_util::BodyExt;

pub const USER_KEY: &str = "test-user-api-key";
pub const SERVICE_KEY: &str = "test-service-api-key";

pub fn test_config() -> BrokerConfig {
    BrokerConfig {
        environment: Environment::Dev,
        service_name: "broker-service-test".to_string(),
        service_version: "0.1.0".to_string(),
        log_level: "error".to_string(),
        port: 0,
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            frontend_url: "http://localhost:3000".to_string(),
        },
        token: TokenConfig {
            signing_secret: "integration-test-secret".to_string(),
            token_expiry_seconds: 3600,
            code_ttl_seconds: 60,
        },
        saml: SamlConfig {
            idp_entity_id: "https://idp.example.com".to_string(),
            idp_sso_url: "https://idp.example.com/sso".to_string(),
            idp_slo_url: Some("https://idp.example.com/slo".to_string()),
            idp_certificate: "unused-in-tests".to_string(),
            sp_entity_id: "https://broker.example.com".to_string(),
            sp_acs_url: "https://broker.example.com/api/auth/saml/acs".to_string(),
            name_id_format: None,
        },
        upstream: UpstreamConfig {
            base_url: "https://api.example.com/v1".to_string(),
            org_link_base: "https://dashboard.example.com/o".to_string(),
            user_api_key: Some(USER_KEY.to_string()),
            service_api_key: Some(SERVICE_KEY.to_string()),
            cache_ttl_seconds: 3600,
            request_timeout_seconds: 5,
            max_retries: 0,
        },
    }
}

/// Fetcher double that counts upstream calls and can be flipped into a
/// failing state.
pub struct CountingFetcher {
    calls: AtomicUsize,
    fail: AtomicBool,
    organizations: Vec<RawOrganization>,
}

impl CountingFetcher {
    pub fn returning(organizations: Vec<RawOrganization>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            organizations,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrganizationFetcher for CountingFetcher {
    async fn list_organizations(
        &self,
        _api_key: &str,
    ) -> Result<Vec<RawOrganization>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("connection refused"));
        }
        Ok(self.organizations.clone())
    }
}

pub fn sample_orgs() -> Vec<RawOrganization> {
    vec![
        RawOrganization {
            id: Some("100".to_string()),
            name: Some("Acme".to_string()),
            url: None,
        },
        RawOrganization {
            id: Some("200".to_string()),
            name: Some("Globex".to_string()),
            url: Some("https://n1.example.com/o/200/manage".to_string()),
        },
    ]
}

/// Assertion outcome the accepting mock IdP hands out.
pub fn jane_outcome() -> AssertionOutcome {
    let mut attributes = HashMap::new();
    attributes.insert(
        "displayName".to_string(),
        vec!["Jane Doe".to_string()],
    );
    attributes.insert("givenName".to_string(), vec!["Jane".to_string()]);
    attributes.insert("sn".to_string(), vec!["Doe".to_string()]);
    attributes.insert("organization".to_string(), vec!["Acme".to_string()]);
    AssertionOutcome {
        subject: "jane@x.com".to_string(),
        attributes,
        session_index: Some("_idx123".to_string()),
    }
}

pub fn test_state(
    saml: Arc<dyn AssertionService>,
    fetcher: Arc<dyn OrganizationFetcher>,
) -> AppState {
    let config = test_config();
    AppState {
        jwt: JwtService::new(&config.token),
        codes: Arc::new(CodeStore::new(Duration::from_secs(
            config.token.code_ttl_seconds,
        ))),
        sessions: Arc::new(SessionStore::new(Duration::from_secs(3600))),
        org_cache: Arc::new(OrgCache::new(
            Duration::from_secs(config.upstream.cache_ttl_seconds),
            config.upstream.org_link_base.clone(),
        )),
        fetcher,
        saml,
        config,
    }
}

/// App wired with an accepting mock IdP and a counting fetcher.
pub fn accepting_app() -> (Router, AppState, Arc<CountingFetcher>) {
    let fetcher = Arc::new(CountingFetcher::returning(sample_orgs()));
    let saml = Arc::new(MockAssertionService::accepting(jane_outcome()));
    let state = test_state(saml, fetcher.clone());
    let app = build_router(state.clone()).expect("router");
    (app, state, fetcher)
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
