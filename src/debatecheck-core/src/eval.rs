//! Metrics against ground truth.
//!
//! Downstream consumer of the session records: extracts a verdict per
//! prediction, aligns on common example ids with a ground-truth file and
//! reports accuracy, per-class precision/recall/F1 and macro-F1 over the
//! three judge labels. UNKNOWN predictions are counted, never hidden.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{DebateError, Result};
use crate::record::SessionRecord;
use crate::verdict::{self, Verdict};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Examples present in both predictions and ground truth.
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub per_class: BTreeMap<Verdict, ClassMetrics>,
    /// Ground-truth label distribution over the evaluated examples.
    pub distribution: BTreeMap<Verdict, usize>,
    /// Predictions where extraction found no label.
    pub unknown_predictions: usize,
}

/// Load a predictions document (either record shape) and extract one verdict
/// per example. Raw records are not modified; extraction is read-only.
pub fn load_predictions(path: impl AsRef<Path>) -> Result<BTreeMap<String, Verdict>> {
    let content = fs::read_to_string(path.as_ref())?;
    let records: BTreeMap<String, SessionRecord> = serde_json::from_str(&content)?;
    Ok(records
        .iter()
        .map(|(id, record)| (id.clone(), verdict::extract_verdict(record)))
        .collect())
}

/// Load ground truth: either `{id: label}` or a list of records with
/// `example_id` and `veracity` fields. Labels pass through the loose
/// synonym normalizer.
pub fn load_ground_truth(path: impl AsRef<Path>) -> Result<BTreeMap<String, Verdict>> {
    let content = fs::read_to_string(path.as_ref())?;
    let document: Value = serde_json::from_str(&content)?;
    let mut labels = BTreeMap::new();
    match document {
        Value::Object(entries) => {
            for (id, value) in entries {
                if let Some(label) = value.as_str() {
                    labels.insert(id, verdict::normalize_label(label));
                }
            }
        }
        Value::Array(entries) => {
            for entry in entries {
                let Some(label) = entry.get("veracity").and_then(Value::as_str) else {
                    continue;
                };
                let Some(id) = entry.get("example_id") else {
                    continue;
                };
                let id = match id {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                labels.insert(id, verdict::normalize_label(label));
            }
        }
        _ => {
            return Err(DebateError::MalformedInput(
                "expected a JSON object or array of ground-truth labels".to_string(),
            ));
        }
    }
    Ok(labels)
}

/// Compare predictions against ground truth over their common ids.
pub fn evaluate(
    predictions: &BTreeMap<String, Verdict>,
    ground_truth: &BTreeMap<String, Verdict>,
) -> EvalReport {
    let mut pairs: Vec<(Verdict, Verdict)> = Vec::new();
    for (id, truth) in ground_truth {
        if let Some(prediction) = predictions.get(id) {
            pairs.push((*truth, *prediction));
        }
    }

    let total = pairs.len();
    let correct = pairs.iter().filter(|(t, p)| t == p).count();
    let unknown_predictions = pairs
        .iter()
        .filter(|(_, p)| *p == Verdict::Unknown)
        .count();

    let mut per_class = BTreeMap::new();
    let mut distribution = BTreeMap::new();
    for class in Verdict::classes() {
        per_class.insert(class, class_metrics(&pairs, class));
        distribution.insert(class, pairs.iter().filter(|(t, _)| *t == class).count());
    }
    let macro_f1 = per_class.values().map(|m| m.f1).sum::<f64>() / Verdict::classes().len() as f64;

    EvalReport {
        total,
        correct,
        accuracy: if total > 0 {
            correct as f64 / total as f64
        } else {
            0.0
        },
        macro_f1,
        per_class,
        distribution,
        unknown_predictions,
    }
}

fn class_metrics(pairs: &[(Verdict, Verdict)], class: Verdict) -> ClassMetrics {
    let tp = pairs.iter().filter(|(t, p)| *t == class && *p == class).count() as f64;
    let fp = pairs.iter().filter(|(t, p)| *t != class && *p == class).count() as f64;
    let fn_ = pairs.iter().filter(|(t, p)| *t == class && *p != class).count() as f64;
    let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
    let recall = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassMetrics {
        precision,
        recall,
        f1,
    }
}
