mod keyword;

pub use keyword::KeywordClassifier;

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("classifier artifacts missing at {path}: {reason}")]
    ArtifactsMissing { path: String, reason: String },
    #[error("invalid classifier artifacts at {path}: {reason}")]
    ArtifactsInvalid { path: String, reason: String },
    #[error("predicted intent `{intent_id}` is not in the command registry")]
    UnknownIntent { intent_id: String },
    #[error("utterance text is empty")]
    EmptyText,
    #[error("classification failed: {0}")]
    Classify(String),
}

/// One classification over one utterance. Consumed exactly once by the router;
/// `source_text` is retained for the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentResult {
    pub intent_id: String,
    pub confidence: f64,
    pub source_text: String,
}

/// External intent-classification capability. Implementations must fail with
/// `UnknownIntent` rather than return a prediction that references no
/// registered command.
pub trait IntentClassifier {
    fn classify(&self, text: &str) -> Result<IntentResult, IntentError>;
}
