use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::server::app::AppState;
use crate::server::auth::bearer_token;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtensionAuthResponse {
    pub is_authenticated: bool,
    pub user_id: String,
    pub email: Option<String>,
}

/// Verify the Clerk session token the browser extension forwards.
pub async fn extension_auth_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ExtensionAuthResponse>> {
    let Some(verifier) = state.jwks.as_ref() else {
        return Err(ApiError::Unavailable("Extension auth is not configured".to_string()));
    };

    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = bearer_token(header)?;
    let claims = verifier.verify(token).await?;

    Ok(Json(ExtensionAuthResponse {
        is_authenticated: true,
        user_id: claims.sub,
        email: claims.email,
    }))
}
