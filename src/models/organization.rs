use serde::{Deserialize, Serialize};

/// Organization record as served to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: String,
    pub name: String,
    /// Dashboard link; prefers an upstream-supplied URL, otherwise a
    /// constructed overview link.
    pub link: String,
}

/// Raw organization record as returned by the upstream dashboard API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOrganization {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}
