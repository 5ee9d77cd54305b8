use super::{AudioSample, CaptureError, SpeechCapture};
use std::io::{BufReader, Read};
use std::process::{Command, Stdio};
use std::time::Duration;

/// Capture backend that delegates to an external recorder command
/// (e.g. `arecord -q -f S16_LE -r 16000 -d {duration}`), reading raw
/// signed-16-bit little-endian PCM from its stdout.
///
/// Silence detection is the recorder's job: a run that produces no PCM within
/// the phrase window is reported as a timeout, any process-level failure as a
/// device error.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    argv: Vec<String>,
    sample_rate: u32,
}

impl CommandCapture {
    /// `argv` is the already-tokenized recorder command line; a literal
    /// `{duration}` argument is replaced with the phrase limit in whole
    /// seconds at each capture.
    pub fn new(argv: Vec<String>, sample_rate: u32) -> Result<Self, CaptureError> {
        if argv.is_empty() {
            return Err(CaptureError::Device(
                "capture command must not be empty".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(CaptureError::Device(
                "capture sample rate must be positive".to_string(),
            ));
        }
        Ok(Self { argv, sample_rate })
    }
}

impl SpeechCapture for CommandCapture {
    fn capture(
        &mut self,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<AudioSample, CaptureError> {
        let seconds = phrase_limit.as_secs().max(1).to_string();
        let argv: Vec<String> = self
            .argv
            .iter()
            .map(|arg| arg.replace("{duration}", &seconds))
            .collect();

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CaptureError::Device(format!(
                    "recorder not found: {}",
                    argv[0]
                )))
            }
            Err(err) => return Err(CaptureError::Device(err.to_string())),
        };

        let mut pcm = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            reader
                .read_to_end(&mut pcm)
                .map_err(|err| CaptureError::Device(err.to_string()))?;
        }
        let status = child
            .wait()
            .map_err(|err| CaptureError::Device(err.to_string()))?;
        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            return Err(CaptureError::Device(format!(
                "recorder exited with {}: {}",
                status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if samples.is_empty() {
            return Err(CaptureError::Timeout { waited: timeout });
        }
        Ok(AudioSample {
            sample_rate: self.sample_rate,
            samples,
        })
    }
}
