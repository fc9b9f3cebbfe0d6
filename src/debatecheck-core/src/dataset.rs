//! Input example collections.
//!
//! An input file is a JSON object keyed by example id, or a JSON array of
//! records carrying an `example_id` field. Each record needs a `claim` and
//! `evidence_full_text`; records missing either are skipped with a warning
//! rather than aborting the run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DebateError, Result};

/// Evidence text as it appears in input files: either one block of text or
/// an ordered list of snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evidence {
    Text(String),
    Snippets(Vec<String>),
}

impl Evidence {
    /// Render the evidence for inclusion in a prompt. Snippets are joined
    /// with newlines, preserving their order.
    pub fn joined(&self) -> String {
        match self {
            Evidence::Text(text) => text.clone(),
            Evidence::Snippets(snippets) => snippets.join("\n"),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Evidence::Text(text) => text.trim().is_empty(),
            Evidence::Snippets(snippets) => snippets.iter().all(|s| s.trim().is_empty()),
        }
    }
}

/// One claim/evidence pair under evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub id: String,
    pub claim: String,
    pub evidence: Evidence,
}

/// An ordered collection of examples loaded from an input file.
#[derive(Debug, Clone, Default)]
pub struct ExampleSet {
    examples: Vec<Example>,
}

impl ExampleSet {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(content)?;
        let mut examples = Vec::new();
        match document {
            Value::Object(entries) => {
                for (id, value) in entries {
                    match parse_record(&id, &value) {
                        Some(example) => examples.push(example),
                        None => tracing::warn!(%id, "skipping malformed example record"),
                    }
                }
            }
            Value::Array(entries) => {
                for (index, value) in entries.iter().enumerate() {
                    let id = value
                        .get("example_id")
                        .map(id_to_string)
                        .unwrap_or_else(|| index.to_string());
                    match parse_record(&id, value) {
                        Some(example) => examples.push(example),
                        None => tracing::warn!(%id, "skipping malformed example record"),
                    }
                }
            }
            _ => {
                return Err(DebateError::MalformedInput(
                    "expected a JSON object or array of examples".to_string(),
                ));
            }
        }
        Ok(Self { examples })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Example> {
        self.examples.iter()
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }
}

fn id_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_record(id: &str, value: &Value) -> Option<Example> {
    let claim = value.get("claim")?.as_str()?.to_string();
    let evidence: Evidence =
        serde_json::from_value(value.get("evidence_full_text")?.clone()).ok()?;
    if claim.trim().is_empty() {
        return None;
    }
    Some(Example {
        id: id.to_string(),
        claim,
        evidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_object_keyed_collection() {
        let json = r#"{
            "17": {"claim": "The sky is green.", "evidence_full_text": "The sky is blue."},
            "3": {"claim": "Water boils at 100C.", "evidence_full_text": ["At sea level,", "water boils at 100C."]}
        }"#;
        let set = ExampleSet::from_json(json).unwrap();
        assert_eq!(set.len(), 2);
        let by_id: Vec<&str> = set.iter().map(|e| e.id.as_str()).collect();
        assert!(by_id.contains(&"17") && by_id.contains(&"3"));
    }

    #[test]
    fn loads_array_collection_with_ids() {
        let json = r#"[
            {"example_id": 42, "claim": "c1", "evidence_full_text": "e1"},
            {"example_id": "abc", "claim": "c2", "evidence_full_text": "e2"}
        ]"#;
        let set = ExampleSet::from_json(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.examples()[0].id, "42");
        assert_eq!(set.examples()[1].id, "abc");
    }

    #[test]
    fn skips_records_missing_fields() {
        let json = r#"{
            "ok": {"claim": "fine", "evidence_full_text": "fine"},
            "no_claim": {"evidence_full_text": "orphan evidence"},
            "no_evidence": {"claim": "orphan claim"}
        }"#;
        let set = ExampleSet::from_json(json).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.examples()[0].id, "ok");
    }

    #[test]
    fn snippet_evidence_joins_in_order() {
        let evidence = Evidence::Snippets(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(evidence.joined(), "first\nsecond");
    }

    #[test]
    fn scalar_document_is_rejected() {
        assert!(ExampleSet::from_json("42").is_err());
    }
}
