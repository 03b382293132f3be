//! LLM-based reranking of search candidates.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::CompletionError;
use crate::models::chunk::Chunk;
use crate::providers::base::CompletionProvider;

/// Candidate content is cut to this many characters in the scoring prompt
/// to bound prompt size.
const PREVIEW_CHARS: usize = 500;

const RERANK_SYSTEM_PROMPT: &str = "You are a relevance scoring system. \
    Rate how relevant each passage is to the query on a scale of 0-10. \
    Return only a JSON array of objects with 'index' and 'score' keys.";

#[derive(Debug, Deserialize)]
struct RelevanceScore {
    index: i64,
    score: f64,
}

fn scores_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "scores": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "index": {"type": "integer"},
                        "score": {"type": "number"},
                    },
                    "required": ["index", "score"],
                    "additionalProperties": false,
                }
            }
        },
        "required": ["scores"],
        "additionalProperties": false,
    })
}

/// Re-score and reorder `chunks` against `query`, returning at most `top_k`.
///
/// Scores are taken as-is (no clamping). Out-of-range indices are dropped;
/// duplicate indices are deduplicated so a chunk is returned at most once.
/// An unparseable scorer body is an error, which the pipeline treats as a
/// hard fallback to the store's order.
pub async fn rerank_chunks(
    provider: &dyn CompletionProvider,
    query: &str,
    chunks: &[Chunk],
    top_k: usize,
) -> Result<Vec<Chunk>, CompletionError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let passages = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{i}] {}", preview(&chunk.content)))
        .collect::<Vec<_>>()
        .join("\n\n");

    let user_prompt = format!(
        "Query: {query}\n\nPassages:\n{passages}\n\n\
         Rate each passage's relevance (0-10). \
         Return JSON array: [{{\"index\": 0, \"score\": 8}}, ...]"
    );

    let body = provider
        .complete_structured(
            RERANK_SYSTEM_PROMPT,
            &user_prompt,
            "relevance_scores",
            scores_schema(),
        )
        .await?;

    let mut scores: Vec<RelevanceScore> = serde_json::from_value(
        body.get("scores").cloned().unwrap_or(Value::Null),
    )
    .map_err(|e| CompletionError::Response(format!("malformed relevance scores: {e}")))?;

    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut seen = HashSet::new();
    let mut reranked = Vec::new();
    for score in scores {
        if reranked.len() == top_k {
            break;
        }
        let Ok(index) = usize::try_from(score.index) else {
            continue;
        };
        if index >= chunks.len() || !seen.insert(index) {
            continue;
        }
        reranked.push(chunks[index].clone());
    }

    tracing::info!(
        candidates = chunks.len(),
        kept = reranked.len(),
        "reranked chunks"
    );
    Ok(reranked)
}

fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk::new(format!("chunk {i}"), 0.5, Value::Null))
            .collect()
    }

    #[tokio::test]
    async fn test_orders_by_score_descending() {
        let provider = MockProvider::new(Vec::new()).with_structured(json!({
            "scores": [
                {"index": 0, "score": 2.0},
                {"index": 1, "score": 9.0},
                {"index": 2, "score": 5.0},
            ]
        }));

        let reranked = rerank_chunks(&provider, "q", &chunks(3), 3).await.unwrap();
        let contents: Vec<_> = reranked.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["chunk 1", "chunk 2", "chunk 0"]);
    }

    #[tokio::test]
    async fn test_drops_out_of_range_and_duplicate_indices() {
        let provider = MockProvider::new(Vec::new()).with_structured(json!({
            "scores": [
                {"index": 7, "score": 10.0},
                {"index": -1, "score": 9.5},
                {"index": 1, "score": 9.0},
                {"index": 1, "score": 8.0},
                {"index": 0, "score": 3.0},
            ]
        }));

        let reranked = rerank_chunks(&provider, "q", &chunks(2), 10).await.unwrap();
        let contents: Vec<_> = reranked.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["chunk 1", "chunk 0"]);
    }

    #[tokio::test]
    async fn test_truncates_to_top_k() {
        let provider = MockProvider::new(Vec::new()).with_structured(json!({
            "scores": (0..6).map(|i| json!({"index": i, "score": 10.0 - i as f64}))
                .collect::<Vec<_>>()
        }));

        let reranked = rerank_chunks(&provider, "q", &chunks(6), 2).await.unwrap();
        assert_eq!(reranked.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let provider =
            MockProvider::new(Vec::new()).with_structured(json!({"scores": "not an array"}));
        let result = rerank_chunks(&provider, "q", &chunks(2), 2).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_scores_accepted_outside_zero_to_ten() {
        let provider = MockProvider::new(Vec::new()).with_structured(json!({
            "scores": [
                {"index": 0, "score": -3.0},
                {"index": 1, "score": 42.0},
            ]
        }));

        let reranked = rerank_chunks(&provider, "q", &chunks(2), 2).await.unwrap();
        let contents: Vec<_> = reranked.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["chunk 1", "chunk 0"]);
    }
}
