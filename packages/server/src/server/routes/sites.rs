//! Extension-facing site endpoints: privacy summary and index status.

use axum::{extract::Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domains::sites::normalize_site_url;
use crate::domains::summary::PolicySummary;
use crate::kernel::DispatchOutcome;
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SiteRequest {
    /// Site URL or bare domain of the company
    pub company_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    Indexed,
    NoData,
    Indexing,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifierResponse {
    pub url: String,
    pub status: IndexState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

fn site_url(company_name: &str) -> ApiResult<String> {
    normalize_site_url(company_name).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub async fn summary_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<SiteRequest>,
) -> ApiResult<Json<PolicySummary>> {
    let url = site_url(&req.company_name)?;
    info!(url = %url, "Summary requested");
    Ok(Json(state.summarizer.summarize_site(&url).await?))
}

/// Index status of a site. Unknown sites are queued for indexing.
pub async fn classifier_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<SiteRequest>,
) -> ApiResult<Json<ClassifierResponse>> {
    let url = site_url(&req.company_name)?;

    let response = match state.deps.sites.lookup(&url).await? {
        Some(status) => ClassifierResponse {
            status: if status.found_data {
                IndexState::Indexed
            } else {
                IndexState::NoData
            },
            url,
            issue: status.issue,
            checked_at: Some(status.checked_at),
        },
        None => {
            if state.deps.background.dispatch(&url) == DispatchOutcome::Started {
                info!(url = %url, "Queued site for indexing");
            }
            ClassifierResponse {
                url,
                status: IndexState::Indexing,
                issue: None,
                checked_at: None,
            }
        }
    };

    Ok(Json(response))
}
