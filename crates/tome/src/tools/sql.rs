//! Natural-language-to-SQL answering over document metadata.
//!
//! The model generates a SELECT against a fixed schema description; the
//! query is validated, scope-filtered, and executed through the injected
//! read-only executor. Every failure mode becomes the returned text so the
//! conversation continues.

use std::sync::Arc;

use indoc::indoc;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::providers::base::CompletionProvider;
use crate::store::SqlExecutor;

const SCHEMA_CONTEXT: &str = indoc! {"
    Available tables (PostgreSQL):

    TABLE documents (
      id UUID PRIMARY KEY,
      user_id UUID NOT NULL,
      filename TEXT NOT NULL,
      file_type TEXT NOT NULL,
      file_size INTEGER NOT NULL,
      storage_path TEXT,
      status TEXT NOT NULL DEFAULT 'pending',  -- pending, processing, completed, failed
      error_message TEXT,
      content_hash TEXT,
      chunk_count INTEGER DEFAULT 0,
      extracted_metadata JSONB,  -- {title, summary, keywords[], document_type, language}
      metadata_status TEXT,
      created_at TIMESTAMPTZ,
      updated_at TIMESTAMPTZ
    );

    TABLE chunks (
      id UUID PRIMARY KEY,
      document_id UUID REFERENCES documents(id) ON DELETE CASCADE,
      user_id UUID NOT NULL,
      content TEXT NOT NULL,
      chunk_index INTEGER NOT NULL,
      metadata JSONB,  -- {filename, chunk_index}
      created_at TIMESTAMPTZ
    );

    IMPORTANT:
    - Always filter by user_id = '{user_id}' for security
    - Only generate SELECT queries
    - Use extracted_metadata->'key' for JSONB access
    - Use extracted_metadata->>'key' for text comparison
"};

const SQL_SYSTEM_PROMPT: &str = "You are a SQL query generator. Convert natural \
    language questions into PostgreSQL SELECT queries. Always include the \
    user_id filter for security. Return only valid SQL.";

lazy_static! {
    static ref SELECT_ONLY: Regex = Regex::new(r"(?i)^\s*(select|with)\b").unwrap();
    static ref FORBIDDEN: Regex = Regex::new(
        r"(?i)\b(insert|update|delete|drop|alter|create|truncate|grant|revoke|copy|execute|exec)\b"
    )
    .unwrap();
}

#[derive(Debug, Deserialize)]
struct SqlQuery {
    sql: String,
    explanation: String,
}

fn query_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sql": {"type": "string"},
            "explanation": {"type": "string"},
        },
        "required": ["sql", "explanation"],
        "additionalProperties": false,
    })
}

/// Reject anything that is not a plain read.
fn validate_sql(sql: &str) -> Result<(), String> {
    if !SELECT_ONLY.is_match(sql) {
        return Err("Only SELECT queries are allowed".to_string());
    }
    if let Some(keyword) = FORBIDDEN.find(sql) {
        return Err(format!("Forbidden SQL keyword: {}", keyword.as_str()));
    }
    Ok(())
}

/// The model is instructed to include the scope filter; as a safety net,
/// substitute any literal placeholder it left behind.
fn inject_scope_filter(sql: &str, user_scope: &str) -> String {
    if sql.contains(user_scope) {
        return sql.to_string();
    }
    sql.replace("{user_id}", user_scope)
}

pub struct SqlTool {
    provider: Arc<dyn CompletionProvider>,
    executor: Arc<dyn SqlExecutor>,
}

impl SqlTool {
    pub fn new(provider: Arc<dyn CompletionProvider>, executor: Arc<dyn SqlExecutor>) -> Self {
        Self { provider, executor }
    }

    /// Answer an analytical question. Never raises; generation, validation,
    /// and execution failures all come back as the result text.
    pub async fn answer(&self, question: &str, user_scope: &str) -> String {
        match self.run(question, user_scope).await {
            Ok(text) => text,
            Err(text) => text,
        }
    }

    async fn run(&self, question: &str, user_scope: &str) -> Result<String, String> {
        let schema = SCHEMA_CONTEXT.replace("{user_id}", user_scope);
        let user_prompt = format!(
            "Schema:\n{schema}\n\nQuestion: {question}\n\n\
             Generate a SELECT query to answer this question. \
             Include user_id = '{user_scope}' in WHERE clause."
        );

        let body = self
            .provider
            .complete_structured(SQL_SYSTEM_PROMPT, &user_prompt, "sql_query", query_schema())
            .await
            .map_err(|e| format!("SQL generation failed: {e}"))?;

        let query: SqlQuery =
            serde_json::from_value(body).map_err(|e| format!("SQL generation failed: {e}"))?;

        validate_sql(&query.sql)?;
        let safe_sql = inject_scope_filter(&query.sql, user_scope);

        match self.executor.execute_readonly(&safe_sql, user_scope).await {
            Ok(rows) => {
                tracing::info!(sql = %preview(&safe_sql), "SQL query executed");
                let mut output = format!(
                    "**Query:** {}\n\n```sql\n{}\n```\n\n",
                    query.explanation, safe_sql
                );
                if rows.is_empty() {
                    output.push_str("**Results:** No rows returned.");
                } else {
                    let rendered = serde_json::to_string_pretty(&rows)
                        .unwrap_or_else(|_| "[]".to_string());
                    output.push_str(&format!(
                        "**Results ({} rows):**\n```json\n{}\n```",
                        rows.len(),
                        rendered
                    ));
                }
                Ok(output)
            }
            Err(e) => {
                tracing::error!("SQL execution failed: {e}");
                Ok(format!(
                    "SQL query failed: {e}\n\nAttempted query:\n```sql\n{safe_sql}\n```"
                ))
            }
        }
    }
}

fn preview(sql: &str) -> String {
    sql.chars().take(100).collect()
}
