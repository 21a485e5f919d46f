use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::Conversation;

const TITLE_MAX_CHARS: usize = 50;
const TITLE_CUT_CHARS: usize = 47;

/// Conversation title from its first question.
pub fn generate_conversation_title(question: &str) -> String {
    if question.chars().count() > TITLE_MAX_CHARS {
        let cut: String = question.chars().take(TITLE_CUT_CHARS).collect();
        format!("{}...", cut)
    } else {
        question.to_string()
    }
}

fn plural(n: i64) -> &'static str {
    if n > 1 {
        "s"
    } else {
        ""
    }
}

/// Human-readable age of `created_at` relative to `now`.
pub fn format_time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(created_at);
    let days = diff.num_days();
    let seconds = diff.num_seconds();

    if days > 0 {
        return match days {
            1 => "Yesterday".to_string(),
            2..=6 => format!("{} days ago", days),
            _ => {
                let weeks = days / 7;
                format!("{} week{} ago", weeks, plural(weeks))
            }
        };
    }

    if seconds > 3600 {
        let hours = seconds / 3600;
        format!("{} hour{} ago", hours, plural(hours))
    } else if seconds > 60 {
        let minutes = seconds / 60;
        format!("{} minute{} ago", minutes, plural(minutes))
    } else {
        "Just now".to_string()
    }
}

/// Entry of a user's conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub time: String,
    pub session_id: String,
    pub message_count: usize,
}

impl ConversationSummary {
    pub fn from_conversation(conversation: &Conversation, now: DateTime<Utc>) -> Self {
        Self {
            id: conversation.session_id.clone(),
            title: conversation.title.clone(),
            time: format_time_ago(conversation.created_at, now),
            session_id: conversation.session_id.clone(),
            message_count: conversation.messages.len(),
        }
    }
}
