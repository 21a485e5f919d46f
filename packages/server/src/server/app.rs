//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::domains::chat::ChatGraph;
use crate::domains::preferences::PreferenceAssistant;
use crate::domains::summary::Summarizer;
use crate::kernel::ServerDeps;
use crate::server::auth::JwksVerifier;
use crate::server::routes::{
    chat_handler, classifier_handler, delete_conversation_handler, extension_auth_handler,
    get_conversation_handler, health_handler, list_conversations_handler, questions_handler,
    root_handler, summary_handler, update_preferences_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
    pub graph: Arc<ChatGraph>,
    pub summarizer: Summarizer,
    pub preferences: PreferenceAssistant,
    /// `None` disables /api/extension-auth
    pub jwks: Option<Arc<JwksVerifier>>,
}

impl AppState {
    pub fn new(deps: ServerDeps, jwks: Option<JwksVerifier>) -> Self {
        let graph = Arc::new(ChatGraph::new(&deps));
        let summarizer = Summarizer::new(
            deps.ai.clone(),
            deps.indexer.clone(),
            deps.models.utility.clone(),
        );
        let preferences = PreferenceAssistant::new(deps.ai.clone(), deps.models.utility.clone());

        Self {
            deps: Arc::new(deps),
            graph,
            summarizer,
            preferences,
            jwks: jwks.map(Arc::new),
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        // No list configured: allow any origin
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/conversations", post(list_conversations_handler))
        .route(
            "/conversation/:session_id",
            get(get_conversation_handler).delete(delete_conversation_handler),
        )
        .route("/summary", post(summary_handler))
        .route("/classifier", post(classifier_handler))
        .route("/preferences/questions", get(questions_handler))
        .route("/preferences", post(update_preferences_handler))
        .route("/api/extension-auth", post(extension_auth_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
