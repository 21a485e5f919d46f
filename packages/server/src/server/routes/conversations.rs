use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domains::conversations::{Conversation, ConversationSummary, DEFAULT_LIST_LIMIT};
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ConversationListRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Conversation not found".to_string())
}

/// Recent conversations of a user, newest first
pub async fn list_conversations_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<ConversationListRequest>,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let now = Utc::now();
    let conversations = state
        .deps
        .conversations
        .list_for_user(&req.user_id, DEFAULT_LIST_LIMIT)
        .await?;

    Ok(Json(
        conversations
            .iter()
            .map(|c| ConversationSummary::from_conversation(c, now))
            .collect(),
    ))
}

pub async fn get_conversation_handler(
    Extension(state): Extension<AppState>,
    Path(session_id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> ApiResult<Json<Conversation>> {
    state
        .deps
        .conversations
        .get(&session_id, owner.user_id.as_deref())
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn delete_conversation_handler(
    Extension(state): Extension<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    if !state.deps.conversations.delete(&session_id).await? {
        return Err(not_found());
    }
    Ok(Json(DeleteResponse {
        message: "Conversation deleted successfully".to_string(),
    }))
}
