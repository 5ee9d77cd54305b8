use super::{IntentClassifier, IntentError, IntentResult};
use crate::registry::Registry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Offline baseline classifier: scores an utterance against example phrases
/// by token overlap. A placeholder for a trained model: the pipeline only
/// sees the `IntentClassifier` contract, so a TF-IDF or network-backed
/// implementation drops in without touching anything downstream.
#[derive(Debug)]
pub struct KeywordClassifier {
    phrases: BTreeMap<String, Vec<BTreeSet<String>>>,
    valid_intents: BTreeSet<String>,
}

impl KeywordClassifier {
    /// Load example phrases from a YAML document mapping intent id to a list
    /// of utterances. Every intent named by the artifacts must exist in the
    /// registry.
    pub fn from_artifacts(path: &Path, registry: &Registry) -> Result<Self, IntentError> {
        let raw = fs::read_to_string(path).map_err(|err| IntentError::ArtifactsMissing {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let document: BTreeMap<String, Vec<String>> =
            serde_yaml::from_str(&raw).map_err(|err| IntentError::ArtifactsInvalid {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        if document.is_empty() {
            return Err(IntentError::ArtifactsInvalid {
                path: path.display().to_string(),
                reason: "no intents defined".to_string(),
            });
        }
        for intent_id in document.keys() {
            if !registry.contains(intent_id) {
                return Err(IntentError::UnknownIntent {
                    intent_id: intent_id.clone(),
                });
            }
        }

        let phrases = document
            .into_iter()
            .map(|(intent_id, examples)| {
                let tokenized = examples.iter().map(|p| tokenize(p)).collect();
                (intent_id, tokenized)
            })
            .collect();
        Ok(Self {
            phrases,
            valid_intents: registry.list_commands().iter().map(|s| s.to_string()).collect(),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_examples(
        registry: &Registry,
        examples: BTreeMap<String, Vec<String>>,
    ) -> Self {
        let phrases = examples
            .into_iter()
            .map(|(intent_id, list)| {
                let tokenized = list.iter().map(|p| tokenize(p)).collect();
                (intent_id, tokenized)
            })
            .collect();
        Self {
            phrases,
            valid_intents: registry.list_commands().iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|t| {
            t.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.union(b).count();
    shared as f64 / union as f64
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Result<IntentResult, IntentError> {
        if text.trim().is_empty() {
            return Err(IntentError::EmptyText);
        }
        let tokens = tokenize(text);

        let mut best_id: Option<&str> = None;
        let mut best_score = 0.0_f64;
        for (intent_id, phrase_sets) in &self.phrases {
            let score = phrase_sets
                .iter()
                .map(|p| jaccard(&tokens, p))
                .fold(0.0_f64, f64::max);
            if best_id.is_none() || score > best_score {
                best_id = Some(intent_id);
                best_score = score;
            }
        }
        let intent_id = best_id
            .ok_or_else(|| IntentError::Classify("classifier has no intents".to_string()))?;
        if !self.valid_intents.contains(intent_id) {
            return Err(IntentError::UnknownIntent {
                intent_id: intent_id.to_string(),
            });
        }

        // The best phrase similarity doubles as the confidence: 1.0 for an
        // exact phrase, 0.0 for no overlap anywhere, which lands in the
        // reject band downstream.
        Ok(IntentResult {
            intent_id: intent_id.to_string(),
            confidence: best_score,
            source_text: text.to_string(),
        })
    }
}
