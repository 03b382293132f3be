use serde::Deserialize;
use serde_json::{json, Value};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// The closed set of tools the model can invoke. Adding a tool means adding
/// a variant here; every dispatch site matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ToolKind {
    SearchDocuments,
    QueryDocumentsSql,
    AnalyzeDocument,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::SearchDocuments => "search_documents",
            ToolKind::QueryDocumentsSql => "query_documents_sql",
            ToolKind::AnalyzeDocument => "analyze_document",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ToolKind::iter().find(|kind| kind.name() == name)
    }

    /// The function-calling schema advertised to the model.
    pub fn schema(&self) -> Value {
        match self {
            ToolKind::SearchDocuments => json!({
                "type": "function",
                "function": {
                    "name": self.name(),
                    "description": "Search the user's uploaded documents for relevant information. Use this tool whenever the user asks any question about their documents, personal information, work history, or any topic that could be in their uploaded files. You can optionally filter by metadata like document_type or language.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "query": {
                                "type": "string",
                                "description": "The search query to find relevant document content"
                            },
                            "filters": {
                                "type": "object",
                                "description": "Optional metadata filters. Keys can include: document_type (e.g. report, article, notes), language (e.g. English), keywords (array of terms)",
                                "properties": {
                                    "document_type": {"type": "string"},
                                    "language": {"type": "string"},
                                },
                            }
                        },
                        "required": ["query"]
                    }
                }
            }),
            ToolKind::QueryDocumentsSql => json!({
                "type": "function",
                "function": {
                    "name": self.name(),
                    "description": "Run analytical queries against the user's documents and chunks using natural language converted to SQL. Use for counting, listing, comparing, or aggregating document metadata. Examples: 'how many documents?', 'list all PDFs', 'total chunks across documents'.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "question": {
                                "type": "string",
                                "description": "The natural language question to convert to SQL"
                            }
                        },
                        "required": ["question"]
                    }
                }
            }),
            ToolKind::AnalyzeDocument => json!({
                "type": "function",
                "function": {
                    "name": self.name(),
                    "description": "Delegate deep analysis of a specific document to a sub-agent that reads the full document content. Use when the user asks to summarize, analyze, review, or deeply examine a particular document. The sub-agent loads all chunks and provides a thorough analysis.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "document_id": {
                                "type": "string",
                                "description": "The UUID of the document to analyze"
                            },
                            "query": {
                                "type": "string",
                                "description": "What to analyze or what question to answer about the document"
                            }
                        },
                        "required": ["document_id", "query"]
                    }
                }
            }),
        }
    }
}

/// Tool schemas to advertise for a request. A scope with no completed
/// documents gets none, so the model cannot invoke retrieval at all.
pub fn available_tools(has_documents: bool) -> Vec<Value> {
    if !has_documents {
        return Vec::new();
    }
    ToolKind::iter().map(|kind| kind.schema()).collect()
}

/// Arguments for `search_documents`.
#[derive(Debug, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub filters: Option<Value>,
}

/// Arguments for `query_documents_sql`.
#[derive(Debug, Deserialize)]
pub struct SqlArgs {
    pub question: String,
}

/// Arguments for `analyze_document`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeArgs {
    pub document_id: String,
    pub query: String,
}
