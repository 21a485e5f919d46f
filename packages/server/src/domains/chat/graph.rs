//! Supervisor → one node → end.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::nodes::{scraping_in_progress_node, ErrorNode, LlmAnswerNode, SearchNode};
use super::prompts::NO_RESPONSE_MESSAGE;
use super::router::{Route, Supervisor};
use super::state::{ChatMessage, ChatState, Role};
use crate::domains::sites::normalize_site_url;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Success,
    NoResponse,
}

/// Result of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub status: ReplyStatus,
    pub session_id: String,
    pub user_id: Option<String>,
    pub current_url: Option<String>,
}

pub struct ChatGraph {
    supervisor: Supervisor,
    search: SearchNode,
    llm_answer: LlmAnswerNode,
    error: ErrorNode,
}

impl ChatGraph {
    pub fn new(deps: &ServerDeps) -> Self {
        Self {
            supervisor: Supervisor::new(
                deps.ai.clone(),
                deps.models.chat.clone(),
                deps.sites.clone(),
                deps.background.clone(),
            ),
            search: SearchNode {
                ai: deps.ai.clone(),
                model: deps.models.chat.clone(),
                indexer: deps.indexer.clone(),
                grader: deps.grader.clone(),
            },
            llm_answer: LlmAnswerNode {
                ai: deps.ai.clone(),
                model: deps.models.chat.clone(),
            },
            error: ErrorNode {
                sites: deps.sites.clone(),
            },
        }
    }

    /// Route the latest message and run the chosen node.
    pub async fn invoke(&self, mut state: ChatState) -> ChatState {
        let route = self.supervisor.decide(&mut state).await;

        let reply = match route {
            Route::Search => Some(self.search.run(&state).await),
            Route::LlmAnswer => Some(self.llm_answer.run(&state).await),
            Route::ScrapingInProgress => Some(scraping_in_progress_node()),
            Route::Error => Some(self.error.run(&state).await),
            Route::Finish => None,
        };

        if let Some(reply) = reply {
            state.messages.push(reply);
        }
        state
    }

    /// Answer one question on top of an existing history.
    pub async fn respond(
        &self,
        question: &str,
        session_id: &str,
        user_id: Option<&str>,
        current_url: Option<&str>,
        history: Vec<ChatMessage>,
    ) -> ChatReply {
        let current_url = current_url
            .filter(|url| !url.trim().is_empty())
            .and_then(|url| match normalize_site_url(url) {
                Ok(normalized) => Some(normalized),
                Err(e) => {
                    warn!(url = %url, error = %e, "Ignoring invalid current url");
                    None
                }
            });

        let mut messages = history;
        messages.push(ChatMessage::user(question));
        let sent = messages.len();

        let state = ChatState {
            messages,
            current_url,
            user_id: user_id.map(str::to_string),
            session_id: Some(session_id.to_string()),
            ..Default::default()
        };

        let state = self.invoke(state).await;

        let answer = state
            .messages
            .get(sent..)
            .and_then(|added| added.iter().rev().find(|m| m.role == Role::Assistant));

        let (response, status) = match answer {
            Some(message) => (message.content.clone(), ReplyStatus::Success),
            None => (NO_RESPONSE_MESSAGE.to_string(), ReplyStatus::NoResponse),
        };

        info!(session_id = %session_id, status = ?status, "Chat turn finished");

        ChatReply {
            response,
            status,
            session_id: session_id.to_string(),
            user_id: user_id.map(str::to_string),
            current_url: state.current_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::chat::prompts::{
        GENERIC_ERROR_MESSAGE, NO_URL_MESSAGE, SCRAPING_IN_PROGRESS_MESSAGE,
        SEARCH_NO_DOCUMENTS_PROMPT,
    };
    use crate::domains::chat::nodes::MAX_SEARCH_REPLY_CHARS;
    use crate::kernel::{MockAI, TestDependencies};
    use policy_index::{ChunkMetadata, ChunkStore, EmbeddedChunk, MemoryStore, PolicyChunk};
    use policy_index::testing::hash_embedding;
    use std::sync::Arc;

    const SITE: &str = "https://example.com/";

    fn graph(deps: TestDependencies) -> (ChatGraph, ServerDeps) {
        let deps = deps.into_deps().unwrap();
        (ChatGraph::new(&deps), deps)
    }

    #[tokio::test]
    async fn test_assistant_last_message_finishes() {
        let ai = MockAI::new();
        let (graph, _) = graph(TestDependencies::new().mock_ai(ai.clone()));

        let state = graph
            .invoke(ChatState::new(vec![ChatMessage::assistant("Hello")]))
            .await;

        assert_eq!(state.messages.len(), 1);
        assert_eq!(ai.call_count(), 0);
    }

    #[tokio::test]
    async fn test_history_question_goes_to_llm_answer() {
        let ai = MockAI::new().with_response("You asked about cookies.");
        let (graph, _) = graph(TestDependencies::new().mock_ai(ai.clone()).with_site(SITE, true, None));

        let history = vec![
            ChatMessage::user("What are cookies?"),
            ChatMessage::assistant("Small files."),
        ];
        let reply = graph
            .respond("What did I ask before?", "s1", None, Some(SITE), history)
            .await;

        assert_eq!(reply.status, ReplyStatus::Success);
        assert_eq!(reply.response, "You asked about cookies.");
        // Answered directly, without a routing call
        assert_eq!(ai.call_count(), 1);
        assert_eq!(ai.calls()[0].messages.len(), 4);
    }

    #[tokio::test]
    async fn test_no_url_goes_to_llm_answer() {
        let ai = MockAI::new().with_response("Cookies are small files.");
        let (graph, _) = graph(TestDependencies::new().mock_ai(ai.clone()));

        let reply = graph.respond("What are cookies?", "s1", Some("u1"), None, Vec::new()).await;

        assert_eq!(reply.response, "Cookies are small files.");
        assert_eq!(reply.user_id.as_deref(), Some("u1"));
        assert_eq!(reply.current_url, None);
        assert_eq!(ai.calls()[0].model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_unknown_site_starts_background_indexing() {
        let ai = MockAI::new();
        let (graph, deps) = graph(TestDependencies::new().mock_ai(ai.clone()));

        let reply = graph
            .respond("Do they sell my data?", "s1", None, Some("http://127.0.0.1:9"), Vec::new())
            .await;

        assert_eq!(reply.response, SCRAPING_IN_PROGRESS_MESSAGE);
        assert_eq!(reply.current_url.as_deref(), Some("http://127.0.0.1:9/"));
        assert_eq!(ai.call_count(), 0);

        // The failed job lands in the registry
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while deps.sites.lookup("http://127.0.0.1:9/").await.unwrap().is_none() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_site_without_data_goes_to_llm_answer() {
        let ai = MockAI::new().with_response("General answer.");
        let (graph, _) = graph(
            TestDependencies::new()
                .mock_ai(ai.clone())
                .with_site(SITE, false, Some("Bot protection detected")),
        );

        let reply = graph.respond("Do they track me?", "s1", None, Some(SITE), Vec::new()).await;

        assert_eq!(reply.response, "General answer.");
        assert_eq!(ai.call_count(), 1);
    }

    #[tokio::test]
    async fn test_search_without_documents_says_so() {
        let ai = MockAI::new()
            .with_response(r#"{"next": "search"}"#)
            .with_response("No indexed documents were found. Generally, ...");
        let (graph, _) = graph(TestDependencies::new().mock_ai(ai.clone()).with_site(SITE, true, None));

        let reply = graph.respond("Do they sell my data?", "s1", None, Some(SITE), Vec::new()).await;

        assert_eq!(reply.status, ReplyStatus::Success);
        let calls = ai.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].system_prompt(), Some(SEARCH_NO_DOCUMENTS_PROMPT));
    }

    #[tokio::test]
    async fn test_search_grades_and_truncates() {
        let store = Arc::new(MemoryStore::new());
        let content = "We sell your browsing data to advertisers.";
        store
            .add_chunks(&[EmbeddedChunk {
                chunk: PolicyChunk {
                    id: "c1".to_string(),
                    site_url: SITE.to_string(),
                    content: content.to_string(),
                    metadata: ChunkMetadata::new("https://example.com/privacy", SITE),
                },
                embedding: hash_embedding(content, 64),
            }])
            .await
            .unwrap();

        let ai = MockAI::new()
            .with_response(r#"{"next": "search"}"#)
            .with_response(r#"{"relevance": 5, "completeness": 5, "faithfulness": 5}"#)
            .with_response(&"y".repeat(2500));
        let mut deps = TestDependencies::new().mock_ai(ai.clone()).with_site(SITE, true, None);
        deps.store = store;
        let (graph, _) = graph(deps);

        let reply = graph.respond("Do they sell my data?", "s1", None, Some(SITE), Vec::new()).await;

        assert!(reply.response.ends_with("... [truncated for brevity]"));
        assert!(reply.response.starts_with(&"y".repeat(MAX_SEARCH_REPLY_CHARS)));

        let answer_call = &ai.calls()[2];
        let system = answer_call.system_prompt().unwrap();
        assert!(system.contains(content));
        assert!(system.contains("Source: https://example.com/privacy"));
    }

    #[tokio::test]
    async fn test_search_error_is_reported() {
        let ai = MockAI::new()
            .with_response(r#"{"next": "search"}"#)
            .with_error("rate limited");
        let (graph, _) = graph(TestDependencies::new().mock_ai(ai).with_site(SITE, true, None));

        let reply = graph.respond("Do they sell my data?", "s1", None, Some(SITE), Vec::new()).await;

        assert_eq!(reply.response, "Search temporarily unavailable. Error: rate limited");
    }

    #[tokio::test]
    async fn test_url_in_message_switches_site() {
        let ai = MockAI::new().with_response("Answer about the other site.");
        let (graph, _) = graph(TestDependencies::new().mock_ai(ai.clone()).with_site(SITE, true, None));

        let reply = graph
            .respond("What does https://other.org say about cookies?", "s1", None, Some(SITE), Vec::new())
            .await;

        assert_eq!(reply.current_url.as_deref(), Some("https://other.org/"));
        assert_eq!(reply.response, "Answer about the other site.");
        // Routed without asking the model
        assert_eq!(ai.call_count(), 1);
    }

    #[tokio::test]
    async fn test_finish_produces_no_response() {
        let ai = MockAI::new().with_response(r#"{"next": "FINISH"}"#);
        let (graph, _) = graph(TestDependencies::new().mock_ai(ai).with_site(SITE, true, None));

        let reply = graph.respond("Thanks, bye", "s1", None, Some(SITE), Vec::new()).await;

        assert_eq!(reply.status, ReplyStatus::NoResponse);
        assert_eq!(reply.response, "No response generated");
    }

    #[tokio::test]
    async fn test_routing_failure_goes_to_error_node() {
        let ai = MockAI::new().with_error("model unavailable");
        let (graph, _) = graph(TestDependencies::new().mock_ai(ai).with_site(SITE, true, None));

        let reply = graph.respond("Do they sell my data?", "s1", None, Some(SITE), Vec::new()).await;
        assert_eq!(reply.response, GENERIC_ERROR_MESSAGE);
        assert_eq!(reply.status, ReplyStatus::Success);
    }

    #[tokio::test]
    async fn test_error_node_messages() {
        let (graph, _) = graph(
            TestDependencies::new().with_site("https://blocked.com/", false, Some("Bot protection detected")),
        );

        let no_url = graph.error.run(&ChatState::default()).await;
        assert_eq!(no_url.content, NO_URL_MESSAGE);

        let blocked = ChatState::default().with_url(Some("https://blocked.com/".to_string()));
        let no_data = graph.error.run(&blocked).await;
        assert!(no_data.content.starts_with("I can't answer questions for this company"));
    }
}
