use axum::{
    extract::{Query, State},
    Json,
};

use crate::dtos::orgs::{OrgView, OrganizationsQuery};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::OrganizationRecord;
use crate::AppState;

/// GET /api/dashboard/organizations — list organizations visible to one of
/// the configured upstream credentials. The caller picks a view; the
/// credential itself never leaves the server.
pub async fn list_organizations(
    State(state): State<AppState>,
    CurrentUser(_profile): CurrentUser,
    Query(query): Query<OrganizationsQuery>,
) -> Result<Json<Vec<OrganizationRecord>>, AppError> {
    let api_key = match query.view {
        OrgView::User => state
            .config
            .upstream
            .user_api_key
            .as_ref()
            .ok_or(AppError::NotConfigured("User view API key"))?,
        OrgView::Service => state
            .config
            .upstream
            .service_api_key
            .as_ref()
            .ok_or(AppError::NotConfigured("Service view API key"))?,
    };

    let organizations = state
        .org_cache
        .get_organizations(state.fetcher.as_ref(), api_key)
        .await?;

    Ok(Json(organizations))
}
