use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domains::preferences::{next_question, PreferenceQuestion, PREFERENCE_QUESTIONS};
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct PreferencesRequest {
    #[serde(default)]
    pub preferences: Value,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub preferences: Value,
    /// `None` once every question is answered
    pub next_question: Option<PreferenceQuestion>,
}

pub async fn questions_handler() -> Json<&'static [PreferenceQuestion]> {
    Json(PREFERENCE_QUESTIONS)
}

pub async fn update_preferences_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<PreferencesRequest>,
) -> ApiResult<Json<PreferencesResponse>> {
    if !(req.preferences.is_null() || req.preferences.is_object()) {
        return Err(ApiError::BadRequest("preferences must be a JSON object".to_string()));
    }

    let preferences = state
        .preferences
        .update_preferences(&req.preferences, &req.answer)
        .await?;
    let next_question = next_question(&preferences).copied();

    Ok(Json(PreferencesResponse {
        preferences,
        next_question,
    }))
}
