mod capture;
mod http_stt;
mod wakeword;

pub use capture::CommandCapture;
pub use http_stt::HttpTranscriber;
pub use wakeword::WakewordStripper;

use std::time::Duration;

/// Mono 16-bit PCM audio, as handed over by a capture backend. The same
/// sample feeds both transcription and speaker verification, so the two trust
/// signals are always measured on identical audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSample {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl AudioSample {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no speech detected within {waited:?}")]
    Timeout { waited: Duration },
    #[error("capture device error: {0}")]
    Device(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("speech was unintelligible")]
    Unintelligible,
    #[error("transcription service error: {0}")]
    Service(String),
}

/// Microphone-side collaborator. Timeouts are retryable (bounded) in the
/// voice loop; device errors are not.
pub trait SpeechCapture {
    fn capture(
        &mut self,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<AudioSample, CaptureError>;
}

/// Speech-to-text collaborator.
pub trait Transcriber {
    fn transcribe(&self, sample: &AudioSample) -> Result<String, TranscribeError>;
}
