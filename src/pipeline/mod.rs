mod voice;

pub use voice::{
    run_voice_session, ConfirmationPrompt, RoundResult, SessionEnd, VoiceSessionOptions,
    VoiceSessionReport,
};

use crate::config::TrustFailurePolicy;
use crate::executor::{CommandExecutor, ExecutionOutcome, ExecutorError};
use crate::intent::{IntentClassifier, IntentError, IntentResult};
use crate::router::{ConfidenceRouter, Routed};
use crate::shared::logging::append_session_log_best_effort;
use crate::speech::{AudioSample, WakewordStripper};
use crate::trust::{SpeakerTrustGate, TrustGateError};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Intent(#[from] IntentError),
    #[error(transparent)]
    Trust(#[from] TrustGateError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error("capture failed: {0}")]
    Capture(#[from] crate::speech::CaptureError),
    #[error("confirmation prompt failed: {source}")]
    Prompt {
        #[source]
        source: std::io::Error,
    },
}

/// A command held at the confirmation suspension point. The driver shows it
/// to the user and feeds the reply back through `resolve_confirmation`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    pub command_id: String,
    pub confidence: f64,
    pub source_text: String,
}

/// Where one utterance ended up. `AwaitingConfirmation` is the only
/// non-terminal state; every other variant closes the utterance.
#[derive(Debug)]
pub enum Disposition {
    Executed { outcome: ExecutionOutcome },
    AwaitingConfirmation { pending: PendingCommand },
    Rejected { intent: IntentResult },
    SpeakerVetoed { confidence: f64 },
}

#[derive(Debug)]
pub enum ConfirmationOutcome {
    Executed { outcome: ExecutionOutcome },
    Cancelled,
}

/// The per-utterance orchestrator. All collaborators are injected; the
/// pipeline holds no ambient global state and processes one utterance at a
/// time, to completion, on the calling thread.
pub struct Pipeline {
    executor: CommandExecutor,
    router: ConfidenceRouter,
    classifier: Box<dyn IntentClassifier>,
    wakeword: WakewordStripper,
    trust: Option<SpeakerTrustGate>,
    trust_policy: TrustFailurePolicy,
    state_root: PathBuf,
}

impl Pipeline {
    pub fn new(
        executor: CommandExecutor,
        router: ConfidenceRouter,
        classifier: Box<dyn IntentClassifier>,
        wakeword: WakewordStripper,
        state_root: PathBuf,
    ) -> Self {
        Self {
            executor,
            router,
            classifier,
            wakeword,
            trust: None,
            trust_policy: TrustFailurePolicy::default(),
            state_root,
        }
    }

    /// Enable the speaker-verification veto for this session.
    pub fn with_trust_gate(mut self, gate: SpeakerTrustGate, policy: TrustFailurePolicy) -> Self {
        self.trust = Some(gate);
        self.trust_policy = policy;
        self
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn trust_gate_mut(&mut self) -> Option<&mut SpeakerTrustGate> {
        self.trust.as_mut()
    }

    /// Run one utterance through wakeword strip, classification, the speaker
    /// veto, and confidence routing. `audio` is the sample the utterance was
    /// transcribed from; text-mode input carries none, so the speaker gate
    /// only applies to voice.
    pub fn process_utterance(
        &mut self,
        text: &str,
        audio: Option<&AudioSample>,
    ) -> Result<Disposition, PipelineError> {
        let cleaned = self.wakeword.strip(text);

        let intent = match self.classifier.classify(&cleaned) {
            Ok(intent) => intent,
            Err(err) => {
                self.audit(&format!("outcome=classify_error detail=\"{err}\""));
                return Err(err.into());
            }
        };

        // The trust gate is a hard veto evaluated before routing, never a
        // confidence modifier.
        if let (Some(gate), Some(sample)) = (&self.trust, audio) {
            match gate.verify(sample) {
                Ok(verification) if !verification.authorized => {
                    self.audit(&format!(
                        "outcome=speaker_vetoed confidence={:.3} intent={} utterance=\"{}\"",
                        verification.confidence, intent.intent_id, intent.source_text
                    ));
                    return Ok(Disposition::SpeakerVetoed {
                        confidence: verification.confidence,
                    });
                }
                Ok(_) => {}
                Err(err) => match self.trust_policy {
                    TrustFailurePolicy::FailClosed => {
                        self.audit(&format!("outcome=trust_error policy=fail_closed detail=\"{err}\""));
                        return Err(err.into());
                    }
                    TrustFailurePolicy::FailOpen => {
                        self.audit(&format!(
                            "outcome=trust_error policy=fail_open detail=\"{err}\" (continuing unverified)"
                        ));
                    }
                },
            }
        }

        match self.router.route(&self.executor, &intent) {
            Ok(Routed::Executed(outcome)) => {
                self.audit(&format!(
                    "outcome=executed intent={} confidence={:.3} utterance=\"{}\"",
                    intent.intent_id, intent.confidence, intent.source_text
                ));
                Ok(Disposition::Executed { outcome })
            }
            Ok(Routed::NeedsConfirmation) => Ok(Disposition::AwaitingConfirmation {
                pending: PendingCommand {
                    command_id: intent.intent_id.clone(),
                    confidence: intent.confidence,
                    source_text: intent.source_text.clone(),
                },
            }),
            Ok(Routed::Rejected) => {
                self.audit(&format!(
                    "outcome=rejected intent={} confidence={:.3} utterance=\"{}\"",
                    intent.intent_id, intent.confidence, intent.source_text
                ));
                Ok(Disposition::Rejected { intent })
            }
            Err(err) => {
                self.audit(&format!(
                    "outcome=execution_error intent={} detail=\"{err}\"",
                    intent.intent_id
                ));
                Err(err.into())
            }
        }
    }

    /// Resolve the confirmation suspension point. Only an explicit
    /// affirmative executes; any other reply cancels with no retry.
    pub fn resolve_confirmation(
        &mut self,
        pending: &PendingCommand,
        reply: &str,
    ) -> Result<ConfirmationOutcome, PipelineError> {
        if !is_affirmative(reply) {
            self.audit(&format!(
                "outcome=cancelled intent={} confidence={:.3}",
                pending.command_id, pending.confidence
            ));
            return Ok(ConfirmationOutcome::Cancelled);
        }
        match self.executor.execute(&pending.command_id) {
            Ok(outcome) => {
                self.audit(&format!(
                    "outcome=executed_after_confirmation intent={} confidence={:.3}",
                    pending.command_id, pending.confidence
                ));
                Ok(ConfirmationOutcome::Executed { outcome })
            }
            Err(err) => {
                self.audit(&format!(
                    "outcome=execution_error intent={} detail=\"{err}\"",
                    pending.command_id
                ));
                Err(err.into())
            }
        }
    }

    fn audit(&self, line: &str) {
        append_session_log_best_effort(&self.state_root, line);
    }
}

fn is_affirmative(reply: &str) -> bool {
    matches!(reply.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::KeywordClassifier;
    use crate::registry::parse_source;
    use crate::router::RoutingThresholds;
    use crate::shared::logging::session_log_path;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn pipeline(state_root: std::path::PathBuf) -> Pipeline {
        let registry = parse_source(
            "LOCK_SCREEN = echo locking\nMUTE_AUDIO = echo muting\nBROKEN = false",
        )
        .expect("registry");
        let mut examples = BTreeMap::new();
        examples.insert(
            "LOCK_SCREEN".to_string(),
            vec!["lock the screen".to_string()],
        );
        examples.insert("MUTE_AUDIO".to_string(), vec!["mute the audio".to_string()]);
        examples.insert("BROKEN".to_string(), vec!["break everything now".to_string()]);
        let classifier = KeywordClassifier::from_examples(&registry, examples);

        Pipeline::new(
            CommandExecutor::new(registry),
            ConfidenceRouter::new(RoutingThresholds::new(0.2, 0.9).expect("thresholds")),
            Box::new(classifier),
            WakewordStripper::new("borealis", false, true),
            state_root,
        )
    }

    #[test]
    fn exact_match_auto_executes_and_audits() {
        let dir = tempdir().expect("tempdir");
        let mut pipeline = pipeline(dir.path().to_path_buf());
        let disposition = pipeline
            .process_utterance("borealis lock the screen", None)
            .expect("disposition");
        match disposition {
            Disposition::Executed { outcome } => {
                assert_eq!(outcome.command_id, "LOCK_SCREEN");
                assert_eq!(outcome.stdout.trim(), "locking");
            }
            other => panic!("unexpected disposition: {other:?}"),
        }
        let log = std::fs::read_to_string(session_log_path(dir.path())).expect("log");
        assert!(log.contains("outcome=executed intent=LOCK_SCREEN"));
    }

    #[test]
    fn partial_match_awaits_confirmation_then_executes_on_yes() {
        let dir = tempdir().expect("tempdir");
        let mut pipeline = pipeline(dir.path().to_path_buf());
        let disposition = pipeline
            .process_utterance("lock screen please", None)
            .expect("disposition");
        let pending = match disposition {
            Disposition::AwaitingConfirmation { pending } => pending,
            other => panic!("unexpected disposition: {other:?}"),
        };
        assert_eq!(pending.command_id, "LOCK_SCREEN");

        let outcome = pipeline
            .resolve_confirmation(&pending, "y")
            .expect("confirmation");
        assert!(matches!(outcome, ConfirmationOutcome::Executed { .. }));
    }

    #[test]
    fn any_non_affirmative_reply_cancels_without_spawning() {
        let dir = tempdir().expect("tempdir");
        let mut pipeline = pipeline(dir.path().to_path_buf());
        let pending = PendingCommand {
            command_id: "BROKEN".to_string(),
            confidence: 0.5,
            source_text: "break everything now".to_string(),
        };
        for reply in ["n", "no", "nope", "", "maybe", "Y E S"] {
            let outcome = pipeline
                .resolve_confirmation(&pending, reply)
                .expect("confirmation");
            assert!(
                matches!(outcome, ConfirmationOutcome::Cancelled),
                "reply {reply:?} must cancel"
            );
        }
        let log = std::fs::read_to_string(session_log_path(dir.path())).expect("log");
        assert!(log.contains("outcome=cancelled"));
        // BROKEN exits non-zero; cancellation must never have run it.
        assert!(!log.contains("execution_error"));
    }

    #[test]
    fn unrelated_utterance_is_rejected_without_executor_call() {
        let dir = tempdir().expect("tempdir");
        let mut pipeline = pipeline(dir.path().to_path_buf());
        let disposition = pipeline
            .process_utterance("please order a pizza", None)
            .expect("disposition");
        match disposition {
            Disposition::Rejected { intent } => assert_eq!(intent.confidence, 0.0),
            other => panic!("unexpected disposition: {other:?}"),
        }
    }

    #[test]
    fn classifier_error_aborts_the_utterance() {
        let dir = tempdir().expect("tempdir");
        let mut pipeline = pipeline(dir.path().to_path_buf());
        let err = pipeline.process_utterance("   ", None).expect_err("empty");
        assert!(matches!(err, PipelineError::Intent(IntentError::EmptyText)));
    }

    #[test]
    fn affirmative_detection_is_strict() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("yeah"));
        assert!(!is_affirmative("ok"));
        assert!(!is_affirmative(""));
    }
}
