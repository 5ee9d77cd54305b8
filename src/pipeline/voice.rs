use super::{ConfirmationOutcome, Disposition, PendingCommand, Pipeline, PipelineError};
use crate::speech::{CaptureError, SpeechCapture, TranscribeError, Transcriber};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct VoiceSessionOptions {
    pub timeout: Duration,
    pub phrase_limit: Duration,
    pub max_capture_attempts: u32,
}

/// Supplies the user's reply at the confirmation suspension point. Drivers:
/// a stdin prompt, a voice follow-up, or a canned harness in tests.
pub trait ConfirmationPrompt {
    fn request(&mut self, pending: &PendingCommand) -> std::io::Result<String>;
}

/// How one voice round closed. Utterance-level failures are recorded here and
/// the session moves on; only device and prompt failures end the session as
/// errors.
#[derive(Debug)]
pub enum RoundResult {
    Executed { command_id: String },
    ExecutedAfterConfirmation { command_id: String },
    Cancelled { command_id: String },
    Rejected { intent_id: String, confidence: f64 },
    SpeakerVetoed { confidence: f64 },
    Unintelligible,
    TranscriptionFailed { message: String },
    UtteranceFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    StopRequested,
    CaptureAttemptsExhausted,
}

#[derive(Debug)]
pub struct VoiceSessionReport {
    pub rounds: Vec<RoundResult>,
    pub end: SessionEnd,
}

/// Continuous voice loop: capture, transcribe, process, repeat. Strictly
/// sequential: each utterance resolves fully before the next capture. The
/// stop flag is honored between blocking steps; a pending command is never
/// executed after a stop.
pub fn run_voice_session(
    pipeline: &mut Pipeline,
    capture: &mut dyn SpeechCapture,
    transcriber: &dyn Transcriber,
    prompt: &mut dyn ConfirmationPrompt,
    options: &VoiceSessionOptions,
    stop: &AtomicBool,
) -> Result<VoiceSessionReport, PipelineError> {
    let mut rounds = Vec::new();

    loop {
        if stop.load(Ordering::Relaxed) {
            return Ok(VoiceSessionReport {
                rounds,
                end: SessionEnd::StopRequested,
            });
        }

        let sample = match capture_with_retry(capture, options, stop)? {
            CaptureRound::Sample(sample) => sample,
            CaptureRound::Stopped => {
                return Ok(VoiceSessionReport {
                    rounds,
                    end: SessionEnd::StopRequested,
                })
            }
            CaptureRound::Exhausted => {
                return Ok(VoiceSessionReport {
                    rounds,
                    end: SessionEnd::CaptureAttemptsExhausted,
                })
            }
        };

        if stop.load(Ordering::Relaxed) {
            return Ok(VoiceSessionReport {
                rounds,
                end: SessionEnd::StopRequested,
            });
        }

        let text = match transcriber.transcribe(&sample) {
            Ok(text) => text,
            Err(TranscribeError::Unintelligible) => {
                rounds.push(RoundResult::Unintelligible);
                continue;
            }
            Err(TranscribeError::Service(message)) => {
                rounds.push(RoundResult::TranscriptionFailed { message });
                continue;
            }
        };

        match pipeline.process_utterance(&text, Some(&sample)) {
            Ok(Disposition::Executed { outcome }) => {
                rounds.push(RoundResult::Executed {
                    command_id: outcome.command_id,
                });
            }
            Ok(Disposition::AwaitingConfirmation { pending }) => {
                if stop.load(Ordering::Relaxed) {
                    // Stop wins over a pending command.
                    return Ok(VoiceSessionReport {
                        rounds,
                        end: SessionEnd::StopRequested,
                    });
                }
                let reply = prompt
                    .request(&pending)
                    .map_err(|source| PipelineError::Prompt { source })?;
                match pipeline.resolve_confirmation(&pending, &reply) {
                    Ok(ConfirmationOutcome::Executed { outcome }) => {
                        rounds.push(RoundResult::ExecutedAfterConfirmation {
                            command_id: outcome.command_id,
                        });
                    }
                    Ok(ConfirmationOutcome::Cancelled) => {
                        rounds.push(RoundResult::Cancelled {
                            command_id: pending.command_id,
                        });
                    }
                    Err(err) => {
                        rounds.push(RoundResult::UtteranceFailed {
                            message: err.to_string(),
                        });
                    }
                }
            }
            Ok(Disposition::Rejected { intent }) => {
                rounds.push(RoundResult::Rejected {
                    intent_id: intent.intent_id,
                    confidence: intent.confidence,
                });
            }
            Ok(Disposition::SpeakerVetoed { confidence }) => {
                rounds.push(RoundResult::SpeakerVetoed { confidence });
            }
            // Utterance-level failure: report and keep listening.
            Err(err) => {
                rounds.push(RoundResult::UtteranceFailed {
                    message: err.to_string(),
                });
            }
        }
    }
}

enum CaptureRound {
    Sample(crate::speech::AudioSample),
    Stopped,
    Exhausted,
}

fn capture_with_retry(
    capture: &mut dyn SpeechCapture,
    options: &VoiceSessionOptions,
    stop: &AtomicBool,
) -> Result<CaptureRound, PipelineError> {
    for _attempt in 0..options.max_capture_attempts.max(1) {
        if stop.load(Ordering::Relaxed) {
            return Ok(CaptureRound::Stopped);
        }
        match capture.capture(options.timeout, options.phrase_limit) {
            Ok(sample) => return Ok(CaptureRound::Sample(sample)),
            Err(CaptureError::Timeout { .. }) => continue,
            // Device failures are not recoverable by retrying the same call.
            Err(err @ CaptureError::Device(_)) => return Err(err.into()),
        }
    }
    Ok(CaptureRound::Exhausted)
}
