//! Per-claim session records.
//!
//! A record carries its kind explicitly from the moment the orchestrator
//! creates it; the untagged serde representation keeps the on-disk shapes
//! (list for single-agent, map for debates) compatible with existing
//! prediction files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Turn label the judge's raw output is stored under.
pub const FINAL_VERDICT: &str = "final_verdict";
/// Legacy judge label found in older prediction files.
pub const LEGACY_VERDICT: &str = "verdict";

/// The outcome of processing one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionRecord {
    /// Single-agent mode: one free-text verdict block.
    Single(Vec<String>),
    /// Multi-agent mode: turn label (e.g. `pro_opening`) to statement text,
    /// plus `final_verdict` and any reformulation metadata.
    Debate(BTreeMap<String, String>),
}

impl SessionRecord {
    /// The free text the verdict extractor should parse, if any.
    pub fn verdict_text(&self) -> Option<&str> {
        match self {
            SessionRecord::Single(outputs) => outputs.first().map(String::as_str),
            SessionRecord::Debate(turns) => turns
                .get(FINAL_VERDICT)
                .or_else(|| turns.get(LEGACY_VERDICT))
                .map(String::as_str),
        }
    }

    /// Number of stored turns/outputs.
    pub fn len(&self) -> usize {
        match self {
            SessionRecord::Single(outputs) => outputs.len(),
            SessionRecord::Debate(turns) => turns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_record_round_trips_as_list() {
        let record = SessionRecord::Single(vec!["[VERDICT]: TRUE".to_string()]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"["[VERDICT]: TRUE"]"#);
        let back: SessionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn debate_record_round_trips_as_map() {
        let mut turns = BTreeMap::new();
        turns.insert("pro_opening".to_string(), "opening text".to_string());
        turns.insert(FINAL_VERDICT.to_string(), "[VERDICT]: FALSE".to_string());
        let record = SessionRecord::Debate(turns);
        let json = serde_json::to_string(&record).unwrap();
        let back: SessionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert!(matches!(back, SessionRecord::Debate(_)));
    }

    #[test]
    fn verdict_text_prefers_final_verdict_over_legacy() {
        let mut turns = BTreeMap::new();
        turns.insert(LEGACY_VERDICT.to_string(), "old".to_string());
        turns.insert(FINAL_VERDICT.to_string(), "new".to_string());
        let record = SessionRecord::Debate(turns);
        assert_eq!(record.verdict_text(), Some("new"));
    }

    #[test]
    fn verdict_text_falls_back_to_legacy_field() {
        let mut turns = BTreeMap::new();
        turns.insert(LEGACY_VERDICT.to_string(), "old".to_string());
        let record = SessionRecord::Debate(turns);
        assert_eq!(record.verdict_text(), Some("old"));
    }

    #[test]
    fn empty_single_record_has_no_verdict_text() {
        let record = SessionRecord::Single(Vec::new());
        assert_eq!(record.verdict_text(), None);
    }
}
