//! The retrieval-augmentation pipeline: document shaping, context assembly,
//! prompt construction, and orchestration.

pub mod context;
pub mod pipeline;
pub mod prompt;

pub use pipeline::RagPipeline;

use serde_json::{Map, Value};

use crate::vector::ScoredPoint;

/// A search hit reshaped for prompt assembly. Transient; never persisted.
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    pub content: String,
    pub source: String,
    pub score: f32,
    pub metadata: Map<String, Value>,
}

impl RetrievedDocument {
    /// Indexed data uses either `content` or `text` for the document body
    /// and either `source` or `activity_id` for provenance, so both chains
    /// are tried in order.
    pub fn from_point(point: ScoredPoint) -> Self {
        let content = non_empty_str(point.payload.get("content"))
            .or_else(|| non_empty_str(point.payload.get("text")))
            .unwrap_or_default();

        let source = point
            .payload
            .get("source")
            .or_else(|| point.payload.get("activity_id"))
            .map(value_to_string)
            .unwrap_or_else(|| "Unknown".to_string());

        RetrievedDocument {
            content,
            source,
            score: point.score,
            metadata: point.payload,
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(payload: Value) -> ScoredPoint {
        ScoredPoint {
            id: "p1".to_string(),
            score: 0.9,
            payload: payload.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn content_prefers_content_field() {
        let doc = RetrievedDocument::from_point(point(json!({
            "content": "primary", "text": "secondary"
        })));
        assert_eq!(doc.content, "primary");
    }

    #[test]
    fn content_falls_back_to_text_when_content_empty() {
        let doc = RetrievedDocument::from_point(point(json!({
            "content": "", "text": "secondary"
        })));
        assert_eq!(doc.content, "secondary");
    }

    #[test]
    fn content_defaults_to_empty_string() {
        let doc = RetrievedDocument::from_point(point(json!({ "other": 1 })));
        assert_eq!(doc.content, "");
    }

    #[test]
    fn source_falls_back_to_activity_id_then_unknown() {
        let doc = RetrievedDocument::from_point(point(json!({ "activity_id": 17 })));
        assert_eq!(doc.source, "17");

        let doc = RetrievedDocument::from_point(point(json!({})));
        assert_eq!(doc.source, "Unknown");
    }

    #[test]
    fn metadata_keeps_the_full_payload() {
        let doc = RetrievedDocument::from_point(point(json!({
            "content": "x", "district": "Swat", "year": 2025
        })));
        assert_eq!(doc.metadata.len(), 3);
        assert_eq!(doc.metadata.get("district"), Some(&json!("Swat")));
    }
}
