use serde::{Deserialize, Serialize};

use crate::rag::prompt::ActionType;

/// One turn of the client-supplied conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Missing and empty queries are both rejected with a 400 by the
    /// pipeline, so the field defaults rather than failing deserialization.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub retrieval_count: Option<u64>,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub documents_retrieved: usize,
    pub sources: Vec<SourceInfo>,
}

/// Compact provenance entry returned to the client; at most 5 per response.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub source: String,
    pub score: String,
    pub content_preview: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub query: String,
    pub context: String,
    pub action_type: ActionType,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub result: String,
    pub action_type: ActionType,
}
