use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A retrieval candidate produced by the document store.
///
/// Chunks are consumed read-only by reranking and formatting; they carry no
/// identity beyond their position in a ranked sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub similarity: f64,
    #[serde(default)]
    pub metadata: Value,
}

impl Chunk {
    pub fn new<S: Into<String>>(content: S, similarity: f64, metadata: Value) -> Self {
        Self {
            content: content.into(),
            similarity,
            metadata,
        }
    }

    /// The source filename recorded at ingestion time, if any
    pub fn filename(&self) -> &str {
        self.metadata
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}
