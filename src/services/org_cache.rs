use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::config::UpstreamConfig;
use crate::error::AppError;
use crate::models::{OrganizationRecord, RawOrganization};

/// Hex chars of the SHA-256 kept as the cache key. A cache key, not a
/// security boundary; still effectively unique across the handful of
/// configured credentials.
const DERIVED_KEY_LEN: usize = 16;

/// Derive the cache key for an upstream credential. The raw credential is
/// never used as a lookup key or stored anywhere in the cache.
pub fn derive_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..DERIVED_KEY_LEN].to_string()
}

/// Upstream "list organizations" call, treated as a black box. Transport,
/// auth, and pagination details live behind this seam.
#[async_trait]
pub trait OrganizationFetcher: Send + Sync {
    async fn list_organizations(&self, api_key: &str)
        -> Result<Vec<RawOrganization>, anyhow::Error>;
}

/// Fetcher backed by the dashboard HTTP API, with a fixed request timeout
/// and a small bounded retry count. Fails fast on exhaustion.
pub struct DashboardFetcher {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl DashboardFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl OrganizationFetcher for DashboardFetcher {
    async fn list_organizations(
        &self,
        api_key: &str,
    ) -> Result<Vec<RawOrganization>, anyhow::Error> {
        let url = format!("{}/organizations", self.base_url);
        let mut backoff = Duration::from_millis(250);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            let result = self
                .client
                .get(&url)
                .bearer_auth(api_key)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<Vec<RawOrganization>>()
                        .await
                        .map_err(|e| anyhow::anyhow!("Failed to parse organizations: {}", e));
                }
                Ok(response) => {
                    let status = response.status();
                    tracing::warn!(attempt, status = %status, "Upstream organizations call failed");
                    last_error = Some(anyhow::anyhow!("Upstream returned {}", status));
                    // Auth failures will not heal on retry.
                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Upstream organizations call errored");
                    last_error = Some(anyhow::anyhow!("Upstream request failed: {}", e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Upstream request failed")))
    }
}

struct CacheEntry {
    organizations: Vec<OrganizationRecord>,
    expires_at: Instant,
}

/// Keyed, TTL-bounded memoization in front of the upstream organization
/// listing. At most one live entry per derived key; entries are replaced
/// wholesale, never partially updated. Two concurrent misses may both call
/// upstream — last write wins with a complete, self-consistent entry.
pub struct OrgCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    org_link_base: String,
}

impl OrgCache {
    pub fn new(ttl: Duration, org_link_base: String) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            org_link_base: org_link_base.trim_end_matches('/').to_string(),
        }
    }

    /// Return the organization list for a credential, serving a live cache
    /// entry when one exists and fetching upstream otherwise.
    ///
    /// Failures are never cached, and an expired entry is never served as
    /// a fallback: a miss plus an upstream error is a hard error.
    pub async fn get_organizations(
        &self,
        fetcher: &dyn OrganizationFetcher,
        api_key: &str,
    ) -> Result<Vec<OrganizationRecord>, AppError> {
        let key = derive_key(api_key);

        if let Some(entry) = self.entries.get(&key) {
            if Instant::now() < entry.expires_at {
                tracing::debug!(key = %key, "Organization cache hit");
                return Ok(entry.organizations.clone());
            }
        }

        let raw = fetcher.list_organizations(api_key).await.map_err(|e| {
            tracing::error!(key = %key, error = %e, "Upstream organization fetch failed");
            AppError::UpstreamUnavailable(e.to_string())
        })?;

        let organizations: Vec<OrganizationRecord> =
            raw.into_iter().map(|o| self.map_record(o)).collect();

        self.entries.insert(
            key,
            CacheEntry {
                organizations: organizations.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );

        Ok(organizations)
    }

    fn map_record(&self, raw: RawOrganization) -> OrganizationRecord {
        let id = raw.id.unwrap_or_default();
        let link = match raw.url.filter(|u| !u.is_empty()) {
            Some(url) => url,
            None if !id.is_empty() => format!("{}/{}/overview", self.org_link_base, id),
            None => String::new(),
        };
        OrganizationRecord {
            id,
            name: raw.name.unwrap_or_default(),
            link,
        }
    }
}
