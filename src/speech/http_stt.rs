use super::{AudioSample, TranscribeError, Transcriber};
use serde::Deserialize;

/// Hosted speech-to-text adapter. Posts the sample as a WAV body to a
/// configured endpoint and expects `{"transcript": "..."}` back.
#[derive(Debug, Clone)]
pub struct HttpTranscriber {
    endpoint: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptEnvelope {
    #[serde(default)]
    transcript: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: &str, language: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            language: language.to_string(),
        }
    }
}

impl Transcriber for HttpTranscriber {
    fn transcribe(&self, sample: &AudioSample) -> Result<String, TranscribeError> {
        let url = format!("{}?lang={}", self.endpoint, self.language);
        let body = wav_bytes(sample);
        let response = ureq::post(&url)
            .set("Content-Type", "audio/wav")
            .send_bytes(&body)
            .map_err(|e| TranscribeError::Service(e.to_string()))?;

        let envelope: TranscriptEnvelope = response
            .into_json()
            .map_err(|e| TranscribeError::Service(e.to_string()))?;
        let transcript = envelope.transcript.trim().to_string();
        if transcript.is_empty() {
            return Err(TranscribeError::Unintelligible);
        }
        Ok(transcript)
    }
}

/// Minimal mono 16-bit PCM WAV container around the raw samples.
fn wav_bytes(sample: &AudioSample) -> Vec<u8> {
    let data_len = (sample.samples.len() * 2) as u32;
    let byte_rate = sample.sample_rate * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for value in &sample.samples {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_describes_the_payload() {
        let sample = AudioSample {
            sample_rate: 16_000,
            samples: vec![0, 1, -1, i16::MAX],
        };
        let bytes = wav_bytes(&sample);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + 8);
        let data_len = u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]);
        assert_eq!(data_len, 8);
        let rate = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
        assert_eq!(rate, 16_000);
    }

    #[test]
    fn unreachable_endpoint_is_a_service_error() {
        let transcriber = HttpTranscriber::new("http://127.0.0.1:1/stt", "en-US");
        let sample = AudioSample {
            sample_rate: 16_000,
            samples: vec![0; 16],
        };
        let err = transcriber.transcribe(&sample).expect_err("service error");
        assert!(matches!(err, TranscribeError::Service(_)));
    }
}
