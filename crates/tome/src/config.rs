use indoc::indoc;
use serde::{Deserialize, Serialize};

/// Connection settings for an OpenAI-compatible completion endpoint.
/// Fetched fresh per request by the HTTP layer and injected here; the
/// engine never reads ambient configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    pub fn new<H, K, M>(host: H, api_key: K, model: M) -> Self
    where
        H: Into<String>,
        K: Into<String>,
        M: Into<String>,
    {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// The agent loop's operating parameters, injected at construction.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// System prompt opening every completion request
    pub system_prompt: String,
    /// Hard bound on tool-calling rounds per user turn
    pub max_rounds: usize,
    /// Tool results are truncated to this many characters in the audit log
    pub result_preview_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_rounds: 5,
            result_preview_chars: 500,
        }
    }
}

pub const SYSTEM_PROMPT: &str = indoc! {r#"
    You are a helpful assistant with access to the user's uploaded documents.

    IMPORTANT RULES:
    - When the user asks about their documents or any topic that might be covered in them, ALWAYS use the search_documents tool first.
    - Answer based strictly on the retrieved document content. Do NOT guess, infer, or add information beyond what the documents contain.
    - If the search returns relevant results, quote or closely paraphrase the source material.
    - If the search returns no results or irrelevant results, say so honestly.
    - When multiple chunks are returned, synthesize them into a complete answer.
    - Cite the source filename when referencing document content.

    TOOL USAGE GUIDANCE:
    - Use search_documents for finding specific information, answering questions about document content, or searching by topic. You can pass optional filters to narrow by document_type, language, or keywords.
    - Use query_documents_sql for analytical questions like counts, listings, comparisons across documents (e.g. "how many documents do I have?", "list my PDFs", "which documents mention X?").
    - Use analyze_document when the user wants deep analysis of a specific document (e.g. "summarize document X in detail", "analyze the key findings in my report"). This delegates to a sub-agent that reads the full document.
"#};
