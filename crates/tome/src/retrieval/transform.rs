//! HyDE (Hypothetical Document Embeddings) query transformation.
//!
//! Questions and document passages live in different embedding
//! neighborhoods. Generating a short hypothetical passage that would answer
//! the query, and embedding that instead, bridges the vocabulary gap and
//! improves retrieval accuracy.

use indoc::indoc;

use crate::errors::CompletionError;
use crate::providers::base::CompletionProvider;

const HYDE_SYSTEM_PROMPT: &str = indoc! {"
    You are a helpful assistant. Given a question, write a short paragraph \
    (3-5 sentences) that would be found in a document answering this question. \
    Write it as factual document content, NOT as a response to a question. \
    Do not start with 'Based on' or 'According to'. Just write the passage.
"};

const HYDE_MAX_TOKENS: u32 = 200;

/// Generate a hypothetical passage answering `query`. Deterministic
/// sampling; the output budget keeps the passage chunk-sized.
///
/// Failure here is non-fatal: the caller embeds the raw query instead.
pub async fn hyde_transform(
    provider: &dyn CompletionProvider,
    query: &str,
) -> Result<String, CompletionError> {
    let passage = provider
        .complete(HYDE_SYSTEM_PROMPT, query, Some(0.0), Some(HYDE_MAX_TOKENS))
        .await?;

    if passage.trim().is_empty() {
        return Err(CompletionError::Response(
            "empty transform output".to_string(),
        ));
    }

    tracing::info!(
        query = %truncate(query, 50),
        passage = %truncate(&passage, 50),
        "using HyDE-transformed query for vector search"
    );
    Ok(passage)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
