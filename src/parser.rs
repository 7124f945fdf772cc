//! Defensive parsing of LLM response text into typed stage outputs.
//!
//! Models rarely return bare JSON. Extraction strategies are tried in order
//! from most to least structured:
//! 1. Direct parse of the trimmed response
//! 2. JSON inside a ```json fenced block
//! 3. Bracket-matched object/array embedded in surrounding prose
//!
//! Shape validation stops here; semantic validation (index ranges,
//! permutation checks) belongs to each stage's `finalize`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{Abstraction, Relationship, RelationshipMap};

/// Why a response could not be parsed into the expected shape.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty response")]
    EmptyResponse,

    #[error("no parseable {expected} found in response: {snippet}")]
    Unparseable { expected: &'static str, snippet: String },
}

fn unparseable(expected: &'static str, text: &str) -> ParseError {
    let snippet: String = text.chars().take(200).collect();
    ParseError::Unparseable { expected, snippet }
}

/// Extract and deserialize a `T` from LLM response text.
pub fn extract_json<T: DeserializeOwned>(
    text: &str,
    expected: &'static str,
) -> Result<T, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    // Strategy 1: the whole response is the payload
    if let Ok(val) = serde_json::from_str::<T>(trimmed) {
        return Ok(val);
    }

    // Strategy 2: fenced code block
    if let Some(block) = fenced_block(trimmed) {
        if let Ok(val) = serde_json::from_str::<T>(block.trim()) {
            return Ok(val);
        }
    }

    // Strategy 3: first opening brace/bracket to its last matching closer
    for open in ['{', '['] {
        let close = if open == '{' { '}' } else { ']' };
        if let Some(start) = trimmed.find(open) {
            let candidate = &trimmed[start..];
            if let Ok(val) = serde_json::from_str::<T>(candidate) {
                return Ok(val);
            }
            if let Some(end) = candidate.rfind(close) {
                if let Ok(val) = serde_json::from_str::<T>(&candidate[..=end]) {
                    return Ok(val);
                }
            }
        }
    }

    Err(unparseable(expected, trimmed))
}

/// Content of the first ```-fenced block, tolerating a `json` language tag.
fn fenced_block(text: &str) -> Option<&str> {
    for marker in ["```json", "```JSON", "```"] {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end) = text[content_start..].find("```") {
                return Some(&text[content_start..content_start + end]);
            }
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct AbstractionEntry {
    name: String,
    description: String,
    #[serde(default)]
    file_indices: Vec<usize>,
}

/// Parse Stage 1 output: a list of named abstractions.
pub fn parse_abstractions(text: &str) -> Result<Vec<Abstraction>, ParseError> {
    let entries: Vec<AbstractionEntry> = extract_json(text, "abstraction list")?;
    Ok(entries
        .into_iter()
        .map(|e| Abstraction {
            name: e.name.trim().to_string(),
            description: e.description.trim().to_string(),
            file_indices: e.file_indices,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct RelationshipEntry {
    from_index: usize,
    to_index: usize,
    label: String,
}

#[derive(Debug, Deserialize)]
struct RelationshipPayload {
    summary: String,
    #[serde(default)]
    relations: Vec<RelationshipEntry>,
}

/// Parse Stage 2 output: a project summary plus labeled edges.
pub fn parse_relationship_map(text: &str) -> Result<RelationshipMap, ParseError> {
    let payload: RelationshipPayload = extract_json(text, "relationship map")?;
    Ok(RelationshipMap {
        summary: payload.summary.trim().to_string(),
        relations: payload
            .relations
            .into_iter()
            .map(|r| Relationship {
                from_index: r.from_index,
                to_index: r.to_index,
                label: r.label.trim().to_string(),
            })
            .collect(),
    })
}

/// Parse Stage 3 output: an ordering over abstraction indices.
pub fn parse_chapter_order(text: &str) -> Result<Vec<usize>, ParseError> {
    extract_json(text, "chapter order")
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── extract_json strategies ──

    #[test]
    fn direct_json() {
        let order: Vec<usize> = extract_json("[2, 0, 1]", "order").unwrap();
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[test]
    fn fenced_json_block() {
        let text = "Here is the ordering:\n```json\n[1, 0]\n```\nHope that helps!";
        let order: Vec<usize> = extract_json(text, "order").unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn fenced_block_without_language_tag() {
        let text = "```\n[0]\n```";
        let order: Vec<usize> = extract_json(text, "order").unwrap();
        assert_eq!(order, vec![0]);
    }

    #[test]
    fn embedded_in_prose() {
        let text = "Sure! The order is [3, 1, 0, 2] based on the dependencies.";
        let order: Vec<usize> = extract_json(text, "order").unwrap();
        assert_eq!(order, vec![3, 1, 0, 2]);
    }

    #[test]
    fn empty_response_fails() {
        assert!(matches!(
            extract_json::<Vec<usize>>("   ", "order"),
            Err(ParseError::EmptyResponse)
        ));
    }

    #[test]
    fn garbage_fails_with_snippet() {
        let err = extract_json::<Vec<usize>>("no structure here at all", "order").unwrap_err();
        match err {
            ParseError::Unparseable { expected, snippet } => {
                assert_eq!(expected, "order");
                assert!(snippet.contains("no structure"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // ── typed parsers ──

    #[test]
    fn abstractions_from_fenced_response() {
        let text = r#"I identified two core concepts:

```json
[
  {"name": "Query Engine", "description": "Executes parsed queries.", "file_indices": [0, 2]},
  {"name": " Storage Layer ", "description": "Persists rows.", "file_indices": [1]}
]
```"#;
        let abstractions = parse_abstractions(text).unwrap();
        assert_eq!(abstractions.len(), 2);
        assert_eq!(abstractions[0].name, "Query Engine");
        assert_eq!(abstractions[0].file_indices, vec![0, 2]);
        // names and descriptions come back trimmed
        assert_eq!(abstractions[1].name, "Storage Layer");
    }

    #[test]
    fn abstractions_default_missing_indices() {
        let text = r#"[{"name": "A", "description": "d"}]"#;
        let abstractions = parse_abstractions(text).unwrap();
        assert!(abstractions[0].file_indices.is_empty());
    }

    #[test]
    fn relationship_map_round_trip() {
        let text = r#"{
            "summary": "A small storage engine.",
            "relations": [
                {"from_index": 0, "to_index": 1, "label": "writes to"}
            ]
        }"#;
        let map = parse_relationship_map(text).unwrap();
        assert_eq!(map.summary, "A small storage engine.");
        assert_eq!(map.relations.len(), 1);
        assert_eq!(map.relations[0].label, "writes to");
    }

    #[test]
    fn relationship_map_requires_summary() {
        let text = r#"{"relations": []}"#;
        assert!(parse_relationship_map(text).is_err());
    }

    #[test]
    fn chapter_order_rejects_non_numeric() {
        assert!(parse_chapter_order(r#"["first", "second"]"#).is_err());
    }
}
