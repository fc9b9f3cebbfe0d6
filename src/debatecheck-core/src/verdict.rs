//! Verdict extraction and normalization.
//!
//! Judge and single-agent output is free text; this module turns it into one
//! of the closed label set {TRUE, FALSE, HALF-TRUE}, or UNKNOWN when nothing
//! matches. Extraction is a pure function of the input text: tagged
//! `[VERDICT]:` lines are tried first, then a bare keyword scan with
//! HALF-TRUE checked before the plain labels so the "TRUE" inside it can
//! never win.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::record::SessionRecord;

/// Final categorical label for a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "TRUE")]
    True,
    #[serde(rename = "FALSE")]
    False,
    #[serde(rename = "HALF-TRUE")]
    HalfTrue,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Verdict {
    /// Canonical spelling used in reports and prediction comparisons.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::True => "TRUE",
            Verdict::False => "FALSE",
            Verdict::HalfTrue => "HALF-TRUE",
            Verdict::Unknown => "UNKNOWN",
        }
    }

    /// The three labels a judge can actually assign.
    pub fn classes() -> [Verdict; 3] {
        [Verdict::True, Verdict::HalfTrue, Verdict::False]
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRUE" => Ok(Verdict::True),
            "FALSE" => Ok(Verdict::False),
            "HALF-TRUE" | "HALF TRUE" => Ok(Verdict::HalfTrue),
            "UNKNOWN" => Ok(Verdict::Unknown),
            _ => Err(()),
        }
    }
}

// Tagged-line tiers, tried in order; within each tier the leftmost match in
// the text wins. HALF-TRUE is listed first in the alternation so it is
// matched as a unit rather than through its trailing "TRUE".
static TAGGED_TIERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)\[VERDICT\]\s*:\s*(HALF[\s-]?TRUE|TRUE|FALSE)\b",
        r"(?is)\*\*VERDICT\*\*\s*:.*?\b(HALF[\s-]?TRUE|TRUE|FALSE)\b",
        r"(?is)\bVERDICT\s*:\s*(HALF[\s-]?TRUE|TRUE|FALSE)\b",
        r"(?is)\bVERDICT\b.*?\b(HALF[\s-]?TRUE|TRUE|FALSE)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("verdict pattern"))
    .collect()
});

// Unanchored keyword fallbacks, checked strictly in this order.
static KEYWORD_HALF_TRUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhalf[\s-]?true\b").expect("keyword pattern"));
static KEYWORD_FALSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfalse\b").expect("keyword pattern"));
static KEYWORD_TRUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btrue\b").expect("keyword pattern"));

fn label_to_verdict(label: &str) -> Verdict {
    let upper = label.to_ascii_uppercase();
    if upper.starts_with("HALF") {
        Verdict::HalfTrue
    } else if upper.starts_with("FALSE") {
        Verdict::False
    } else {
        Verdict::True
    }
}

/// Extract a verdict from free-form judge or single-agent text.
pub fn extract_from_text(text: &str) -> Verdict {
    for tier in TAGGED_TIERS.iter() {
        if let Some(caps) = tier.captures(text) {
            if let Some(label) = caps.get(1) {
                return label_to_verdict(label.as_str());
            }
        }
    }

    if KEYWORD_HALF_TRUE.is_match(text) {
        Verdict::HalfTrue
    } else if KEYWORD_FALSE.is_match(text) {
        Verdict::False
    } else if KEYWORD_TRUE.is_match(text) {
        Verdict::True
    } else {
        Verdict::Unknown
    }
}

/// Extract a verdict from a session record of either shape.
pub fn extract_verdict(record: &SessionRecord) -> Verdict {
    match record.verdict_text() {
        Some(text) => extract_from_text(text),
        None => Verdict::Unknown,
    }
}

/// Loose synonym mapper for ground-truth labels.
///
/// Only used when comparing against a ground-truth file that may phrase its
/// labels differently; never applied to model output before storage.
pub fn normalize_label(label: &str) -> Verdict {
    let lower = label.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return Verdict::Unknown;
    }
    if (lower.contains("half") && lower.contains("true"))
        || lower.contains("partially")
        || lower.contains("partly")
    {
        return Verdict::HalfTrue;
    }
    match lower.as_str() {
        "true" | "correct" | "accurate" => Verdict::True,
        "false" | "incorrect" | "wrong" => Verdict::False,
        _ => lower.parse().unwrap_or(Verdict::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn tagged_verdict_line_extracts() {
        let text = "[VERDICT]: FALSE\n[REASON]: Evidence contradicts the claim.";
        assert_eq!(extract_from_text(text), Verdict::False);
    }

    #[test]
    fn tagged_line_is_case_insensitive() {
        assert_eq!(extract_from_text("[verdict]: true"), Verdict::True);
        assert_eq!(extract_from_text("Verdict: half-true"), Verdict::HalfTrue);
    }

    #[test]
    fn bold_markdown_verdict_extracts() {
        let text = "**VERDICT**: after weighing both sides, FALSE.";
        assert_eq!(extract_from_text(text), Verdict::False);
    }

    #[test]
    fn bare_verdict_with_intervening_text_extracts() {
        let text = "VERDICT after much deliberation is HALF-TRUE overall";
        assert_eq!(extract_from_text(text), Verdict::HalfTrue);
    }

    #[test]
    fn half_true_is_matched_as_a_unit_in_tagged_line() {
        assert_eq!(extract_from_text("[VERDICT]: HALF-TRUE"), Verdict::HalfTrue);
        assert_eq!(extract_from_text("[VERDICT]: HALF TRUE"), Verdict::HalfTrue);
    }

    #[test]
    fn tagged_match_beats_stray_keywords() {
        let text = "Some say it is true.\n[VERDICT]: HALF-TRUE\nOthers insist on true.";
        assert_eq!(extract_from_text(text), Verdict::HalfTrue);
    }

    #[test]
    fn first_tagged_line_wins() {
        let text = "[VERDICT]: FALSE\nOn reflection...\n[VERDICT]: TRUE";
        assert_eq!(extract_from_text(text), Verdict::False);
    }

    #[test]
    fn keyword_scan_checks_half_true_before_plain_labels() {
        let text = "The debate was inconclusive, though most evidence points to half true.";
        assert_eq!(extract_from_text(text), Verdict::HalfTrue);
        // half-true after a bare "false" still wins: half-true is scanned first
        let text = "Not entirely false, rather half-true on balance.";
        assert_eq!(extract_from_text(text), Verdict::HalfTrue);
    }

    #[test]
    fn keyword_scan_prefers_false_over_true() {
        let text = "true in parts but ultimately false";
        assert_eq!(extract_from_text(text), Verdict::False);
    }

    #[test]
    fn substrings_inside_words_do_not_match() {
        assert_eq!(extract_from_text("construed"), Verdict::Unknown);
        assert_eq!(extract_from_text("truely"), Verdict::Unknown);
        assert_eq!(extract_from_text("falsehoods abound"), Verdict::Unknown);
    }

    #[test]
    fn empty_and_unmatched_text_is_unknown() {
        assert_eq!(extract_from_text(""), Verdict::Unknown);
        assert_eq!(extract_from_text("no label here"), Verdict::Unknown);
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "[VERDICT]: TRUE\nbecause reasons";
        let first = extract_from_text(text);
        for _ in 0..10 {
            assert_eq!(extract_from_text(text), first);
        }
    }

    #[test]
    fn extracts_from_single_record() {
        let record = SessionRecord::Single(vec![
            "[VERDICT]: TRUE\n[REASON]: supported.".to_string(),
        ]);
        assert_eq!(extract_verdict(&record), Verdict::True);
    }

    #[test]
    fn extracts_from_debate_record_final_verdict() {
        let mut turns = BTreeMap::new();
        turns.insert(
            "final_verdict".to_string(),
            "The debate was inconclusive, though most evidence points to half true.".to_string(),
        );
        let record = SessionRecord::Debate(turns);
        assert_eq!(extract_verdict(&record), Verdict::HalfTrue);
    }

    #[test]
    fn extracts_from_legacy_verdict_field() {
        let mut turns = BTreeMap::new();
        turns.insert("verdict".to_string(), "[VERDICT]: FALSE".to_string());
        let record = SessionRecord::Debate(turns);
        assert_eq!(extract_verdict(&record), Verdict::False);
    }

    #[test]
    fn empty_record_is_unknown() {
        assert_eq!(extract_verdict(&SessionRecord::Single(vec![])), Verdict::Unknown);
        assert_eq!(
            extract_verdict(&SessionRecord::Debate(BTreeMap::new())),
            Verdict::Unknown
        );
    }

    #[test]
    fn normalize_maps_synonyms() {
        assert_eq!(normalize_label("correct"), Verdict::True);
        assert_eq!(normalize_label("Accurate"), Verdict::True);
        assert_eq!(normalize_label("incorrect"), Verdict::False);
        assert_eq!(normalize_label("wrong"), Verdict::False);
        assert_eq!(normalize_label("partially correct"), Verdict::HalfTrue);
        assert_eq!(normalize_label("partly true"), Verdict::HalfTrue);
        assert_eq!(normalize_label("mostly half true"), Verdict::HalfTrue);
    }

    #[test]
    fn normalize_passes_canonical_labels_through() {
        assert_eq!(normalize_label("TRUE"), Verdict::True);
        assert_eq!(normalize_label("half-true"), Verdict::HalfTrue);
        assert_eq!(normalize_label("false"), Verdict::False);
        assert_eq!(normalize_label("gibberish"), Verdict::Unknown);
    }

    #[test]
    fn canonical_spelling_round_trips() {
        for verdict in [Verdict::True, Verdict::False, Verdict::HalfTrue, Verdict::Unknown] {
            assert_eq!(verdict.as_str().parse::<Verdict>().unwrap(), verdict);
        }
    }
}
