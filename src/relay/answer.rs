//! Normalization of grounded-generation responses into the relay's shape.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::gemini::{GenerateContentResponse, GroundingChunk, UsageMetadata};
use crate::relay::types::{Citation, QueryOutcome, UsageStats};

/// Text returned when the model produced no usable candidate.
pub(crate) const FALLBACK_RESPONSE: &str =
    "Could not generate response. The model may not have found relevant information in the documents.";

static PAGE_MARKER: OnceLock<Regex> = OnceLock::new();

fn page_marker() -> &'static Regex {
    PAGE_MARKER.get_or_init(|| Regex::new(r"--- PAGE (\d+) ---").expect("valid page pattern"))
}

/// Collapse a raw generation response into the stable relay shape: first
/// candidate text (or the fallback sentence), citations in grounding order,
/// and token usage when reported.
pub(crate) fn normalize_answer(query: &str, response: GenerateContentResponse) -> QueryOutcome {
    let text = extract_text(&response);
    let citations = extract_citations(&response);
    let usage = response.usage_metadata.map(normalize_usage);

    QueryOutcome {
        query: query.to_string(),
        response: text,
        citations,
        usage,
    }
}

fn extract_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.first())
        .and_then(|part| part.text.clone())
        .unwrap_or_else(|| FALLBACK_RESPONSE.to_string())
}

fn extract_citations(response: &GenerateContentResponse) -> Vec<Citation> {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.grounding_metadata.as_ref())
        .map(|metadata| metadata.grounding_chunks.iter().map(normalize_chunk).collect())
        .unwrap_or_default()
}

fn normalize_chunk(chunk: &GroundingChunk) -> Citation {
    if let Some(context) = &chunk.retrieved_context {
        let text = context.text.clone().unwrap_or_default();
        Citation {
            page: extract_pages(&text),
            source: context
                .title
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            text,
        }
    } else {
        Citation {
            text: chunk.content.as_ref().map(stringify_content).unwrap_or_default(),
            source: chunk.source.clone().unwrap_or_else(|| "Unknown".to_string()),
            page: String::new(),
        }
    }
}

fn stringify_content(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Collect `--- PAGE n ---` markers into a label like `Page 3, 7`.
fn extract_pages(text: &str) -> String {
    let pages: Vec<&str> = page_marker()
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|group| group.as_str())
        .collect();
    if pages.is_empty() {
        String::new()
    } else {
        format!("Page {}", pages.join(", "))
    }
}

fn normalize_usage(metadata: UsageMetadata) -> UsageStats {
    UsageStats {
        total_token_count: metadata.total_token_count,
        prompt_token_count: metadata.prompt_token_count,
        candidates_token_count: metadata.candidates_token_count,
    }
}
