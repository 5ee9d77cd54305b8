use super::TrustGateError;
use crate::speech::AudioSample;

/// Acoustic feature extraction seam. The pipeline never looks at the vector's
/// meaning; only dimensional consistency matters to the model downstream.
pub trait FeatureExtractor {
    fn extract(&self, sample: &AudioSample) -> Result<Vec<f32>, TrustGateError>;
}

/// Frame-energy statistics extractor: RMS and zero-crossing-rate statistics
/// over fixed-size frames. A stand-in for a real MFCC front end: coarse, but
/// speaker-dependent enough to exercise the trust protocol end to end, and
/// replaceable behind the trait without touching the gate.
#[derive(Debug, Clone)]
pub struct EnergyStatsExtractor {
    frame_size: usize,
}

impl EnergyStatsExtractor {
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame_size: frame_size.max(1),
        }
    }
}

impl Default for EnergyStatsExtractor {
    fn default() -> Self {
        // 25 ms frames at 16 kHz.
        Self::new(400)
    }
}

impl FeatureExtractor for EnergyStatsExtractor {
    fn extract(&self, sample: &AudioSample) -> Result<Vec<f32>, TrustGateError> {
        if sample.samples.is_empty() {
            return Err(TrustGateError::Feature("empty audio sample".to_string()));
        }

        let mut rms_values = Vec::new();
        let mut zcr_values = Vec::new();
        for frame in sample.samples.chunks(self.frame_size) {
            rms_values.push(frame_rms(frame));
            zcr_values.push(frame_zcr(frame));
        }

        let (rms_mean, rms_std) = mean_std(&rms_values);
        let (zcr_mean, zcr_std) = mean_std(&zcr_values);
        let rms_min = rms_values.iter().copied().fold(f32::INFINITY, f32::min);
        let rms_max = rms_values.iter().copied().fold(0.0_f32, f32::max);
        let peak = sample
            .samples
            .iter()
            .map(|s| (*s as f32).abs())
            .fold(0.0_f32, f32::max)
            / i16::MAX as f32;
        let frame_count = rms_values.len() as f32;

        Ok(vec![
            rms_mean, rms_std, rms_min, rms_max, zcr_mean, zcr_std, peak, frame_count,
        ])
    }
}

fn frame_rms(frame: &[i16]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = frame.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    ((sum_squares / frame.len() as f64).sqrt() / i16::MAX as f64) as f32
}

fn frame_zcr(frame: &[i16]) -> f32 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|pair| (pair[0] < 0) != (pair[1] < 0))
        .count();
    crossings as f32 / (frame.len() - 1) as f32
}

fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(amplitude: i16, period: usize, len: usize) -> AudioSample {
        let samples = (0..len)
            .map(|i| {
                if (i / period) % 2 == 0 {
                    amplitude
                } else {
                    -amplitude
                }
            })
            .collect();
        AudioSample {
            sample_rate: 16_000,
            samples,
        }
    }

    #[test]
    fn empty_sample_is_a_feature_error() {
        let extractor = EnergyStatsExtractor::default();
        let err = extractor
            .extract(&AudioSample {
                sample_rate: 16_000,
                samples: Vec::new(),
            })
            .expect_err("empty");
        assert!(matches!(err, TrustGateError::Feature(_)));
    }

    #[test]
    fn feature_vector_has_fixed_dimension() {
        let extractor = EnergyStatsExtractor::default();
        let short = extractor.extract(&tone(1000, 8, 500)).expect("short");
        let long = extractor.extract(&tone(1000, 8, 8_000)).expect("long");
        assert_eq!(short.len(), 8);
        assert_eq!(long.len(), 8);
    }

    #[test]
    fn louder_audio_scores_higher_energy() {
        let extractor = EnergyStatsExtractor::default();
        let quiet = extractor.extract(&tone(500, 8, 4_000)).expect("quiet");
        let loud = extractor.extract(&tone(20_000, 8, 4_000)).expect("loud");
        assert!(loud[0] > quiet[0]);
        assert!(loud[6] > quiet[6]);
    }

    #[test]
    fn faster_alternation_raises_zero_crossing_rate() {
        let extractor = EnergyStatsExtractor::default();
        let slow = extractor.extract(&tone(1000, 64, 4_000)).expect("slow");
        let fast = extractor.extract(&tone(1000, 2, 4_000)).expect("fast");
        assert!(fast[4] > slow[4]);
    }
}
