use axum::{extract::Extension, Json};
use serde::Deserialize;
use tracing::{info, warn};

use crate::domains::chat::{ChatMessage, ChatReply};
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    /// Required for conversation memory
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub current_url: Option<String>,
}

/// One chat turn: load history, run the graph, save the exchange.
pub async fn chat_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatReply>> {
    if req.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }
    if req.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("session_id must not be empty".to_string()));
    }

    let conversation = state.deps.conversations.get(&req.session_id, None).await?;
    if let (Some(owner), Some(user_id)) = (
        conversation.as_ref().and_then(|c| c.user_id.as_deref()),
        req.user_id.as_deref(),
    ) {
        if owner != user_id {
            return Err(ApiError::Forbidden(
                "Conversation belongs to another user".to_string(),
            ));
        }
    }

    let history: Vec<ChatMessage> = conversation
        .as_ref()
        .map(|c| c.messages.iter().filter_map(|m| m.to_chat_message()).collect())
        .unwrap_or_default();
    let current_url = req
        .current_url
        .clone()
        .or_else(|| conversation.as_ref().and_then(|c| c.url.clone()));

    info!(
        session_id = %req.session_id,
        history = history.len(),
        url = ?current_url,
        "Chat request"
    );

    let reply = state
        .graph
        .respond(
            &req.question,
            &req.session_id,
            req.user_id.as_deref(),
            current_url.as_deref(),
            history,
        )
        .await;

    if let Err(e) = state
        .deps
        .conversations
        .save_exchange(
            &req.session_id,
            &req.question,
            &reply.response,
            req.user_id.as_deref(),
            reply.current_url.as_deref(),
        )
        .await
    {
        warn!(session_id = %req.session_id, error = %e, "Failed to save conversation");
    }

    Ok(Json(reply))
}
