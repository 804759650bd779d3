//! Knowledge base document types.
//!
//! Data shapes for the retrieval-service port: scored search results,
//! content listings, and sources for new content.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A document returned from a similarity search, with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// Document name or title.
    pub name: String,
    /// Document text (or the matching excerpt).
    pub content: String,
    /// Relevance score, higher is more relevant.
    pub score: f32,
    /// Metadata the document was indexed with.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A content item listed from the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    /// Name of the content item.
    pub name: String,
    /// A short summary of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Metadata the content is indexed with.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Source material for adding content to the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSource {
    /// Fetch and index content from a URL.
    Url { url: String },
    /// Index inline text directly.
    Inline { text: String },
}

/// Outcome of adding content to the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    /// The content was indexed.
    Added,
    /// A near-identical item already existed; nothing was indexed.
    Duplicate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_source_serde() {
        let source = ContentSource::Url {
            url: "https://docs.example.com/guide.pdf".to_string(),
        };
        let text = serde_json::to_string(&source).unwrap();
        assert!(text.contains("\"type\":\"url\""));
        let parsed: ContentSource = serde_json::from_str(&text).unwrap();
        assert!(matches!(parsed, ContentSource::Url { .. }));
    }

    #[test]
    fn scored_document_roundtrip() {
        let doc = ScoredDocument {
            name: "pricing".to_string(),
            content: "Plans start at $10/mo".to_string(),
            score: 0.87,
            metadata: HashMap::from([("source".to_string(), "web".to_string())]),
        };
        let text = serde_json::to_string(&doc).unwrap();
        let parsed: ScoredDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.name, "pricing");
        assert!((parsed.score - 0.87).abs() < f32::EPSILON);
    }
}
