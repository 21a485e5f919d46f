use serde::{Deserialize, Serialize};

pub const UNAVAILABLE_MESSAGE: &str = "Unable to find data due to bot protection rules";

/// How a clause should be flagged in the extension UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseType {
    Danger,
    Warning,
    Success,
    #[serde(other)]
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    #[serde(rename = "type")]
    pub kind: ClauseType,
    #[serde(default)]
    pub icon: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Four-clause privacy summary of a site, or the "unavailable" object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    #[serde(default)]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub risk_level: String,
    pub summary_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clauses: Vec<Clause>,
}

impl PolicySummary {
    /// Returned when nothing usable is known about a site.
    pub fn unavailable() -> Self {
        Self {
            error: true,
            message: Some(UNAVAILABLE_MESSAGE.to_string()),
            risk_level: "Unknown".to_string(),
            summary_text: "Data unavailable".to_string(),
            clauses: Vec::new(),
        }
    }

    /// A usable summary: not flagged as an error and carrying clauses.
    pub fn is_usable(&self) -> bool {
        !self.error && !self.clauses.is_empty()
    }
}
