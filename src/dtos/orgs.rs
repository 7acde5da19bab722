use serde::Deserialize;

/// Which configured upstream credential to list organizations with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgView {
    User,
    Service,
}

impl Default for OrgView {
    fn default() -> Self {
        OrgView::User
    }
}

#[derive(Debug, Deserialize)]
pub struct OrganizationsQuery {
    #[serde(default)]
    pub view: OrgView,
}
