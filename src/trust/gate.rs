use super::classifier::{CentroidClassifier, FeatureScaler, SpeakerClass};
use super::features::FeatureExtractor;
use super::store::{load_snapshot, remove_snapshot, save_snapshot, TrustSnapshot};
use super::TrustGateError;
use crate::speech::AudioSample;
use std::path::{Path, PathBuf};

/// Outcome of one verification attempt. `confidence` is the probability of
/// the *predicted* class: when the prediction is "impostor", it is the
/// impostor probability, not the probability of being the enrolled speaker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verification {
    pub authorized: bool,
    pub confidence: f64,
}

struct TrainedModel {
    scaler: FeatureScaler,
    classifier: CentroidClassifier,
}

/// Accumulative speaker-verification gate.
///
/// Known approximations, preserved deliberately:
/// - The classifier needs two classes, but enrollment only ever sees the
///   enrolled speaker. Each training round pairs the sample with ONE
///   synthetically perturbed copy as the impostor class, so false-accept and
///   false-reject rates are never calibrated against real impostors.
/// - "Accumulative" means the sample counter grows. Each enrollment retrains
///   from scratch on only the latest sample (plus its synthetic negative);
///   earlier samples survive only in the counter. The scaler is fitted once,
///   on the first enrollment, and reused afterwards.
pub struct SpeakerTrustGate {
    extractor: Box<dyn FeatureExtractor>,
    store_path: PathBuf,
    threshold: f64,
    sample_count: u64,
    model: Option<TrainedModel>,
}

impl SpeakerTrustGate {
    /// Open the gate, restoring persisted state if the store exists. The
    /// snapshot's threshold wins over `threshold` so that a re-configured
    /// default does not silently change an already-enrolled profile.
    pub fn open(
        store_path: &Path,
        threshold: f64,
        extractor: Box<dyn FeatureExtractor>,
    ) -> Result<Self, TrustGateError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(TrustGateError::Model(format!(
                "speaker threshold must be within [0, 1], got {threshold}"
            )));
        }
        let mut gate = Self {
            extractor,
            store_path: store_path.to_path_buf(),
            threshold,
            sample_count: 0,
            model: None,
        };
        if let Some(snapshot) = load_snapshot(store_path)? {
            gate.threshold = snapshot.threshold;
            gate.sample_count = snapshot.sample_count;
            if snapshot.is_trained {
                gate.model = Some(TrainedModel {
                    scaler: snapshot.scaler,
                    classifier: snapshot.classifier,
                });
            }
        }
        Ok(gate)
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Fold one sample of the enrolled speaker into the trust model and
    /// persist the result. State only changes once the snapshot is on disk.
    pub fn enroll(&mut self, sample: &AudioSample) -> Result<(), TrustGateError> {
        let features = self.extractor.extract(sample)?;
        let negative = perturbed_negative(&features)?;

        let model = match &self.model {
            None => {
                let rows = vec![features, negative];
                let scaler = FeatureScaler::fit(&rows)?;
                let scaled: Vec<Vec<f32>> = rows
                    .iter()
                    .map(|row| scaler.transform(row))
                    .collect::<Result<_, _>>()?;
                let classifier = CentroidClassifier::fit(
                    &scaled,
                    &[SpeakerClass::Enrolled, SpeakerClass::Impostor],
                )?;
                TrainedModel { scaler, classifier }
            }
            Some(existing) => {
                let scaled_positive = existing.scaler.transform(&features)?;
                let scaled_negative = existing.scaler.transform(&negative)?;
                let classifier = CentroidClassifier::fit(
                    &[scaled_positive, scaled_negative],
                    &[SpeakerClass::Enrolled, SpeakerClass::Impostor],
                )?;
                TrainedModel {
                    scaler: existing.scaler.clone(),
                    classifier,
                }
            }
        };

        let next_count = self.sample_count + 1;
        self.persist(&model, next_count)?;
        self.sample_count = next_count;
        self.model = Some(model);
        Ok(())
    }

    /// Check a sample against the enrolled identity.
    pub fn verify(&self, sample: &AudioSample) -> Result<Verification, TrustGateError> {
        let model = self.model.as_ref().ok_or(TrustGateError::NotTrained)?;
        let features = self.extractor.extract(sample)?;
        let scaled = model.scaler.transform(&features)?;
        let (predicted, confidence) = model.classifier.predict(&scaled)?;
        Ok(Verification {
            authorized: predicted == SpeakerClass::Enrolled && confidence >= self.threshold,
            confidence,
        })
    }

    /// Discard the model and all persisted state.
    pub fn reset(&mut self) -> Result<(), TrustGateError> {
        self.model = None;
        self.sample_count = 0;
        remove_snapshot(&self.store_path)
    }

    fn persist(&self, model: &TrainedModel, sample_count: u64) -> Result<(), TrustGateError> {
        let snapshot = TrustSnapshot {
            sample_count,
            is_trained: true,
            threshold: self.threshold,
            scaler: model.scaler.clone(),
            classifier: model.classifier.clone(),
        };
        save_snapshot(&self.store_path, &snapshot)
    }
}

/// One synthetic impostor row: the sample's features shifted by unit-scale
/// uniform noise. Gives the binary classifier its required second class.
fn perturbed_negative(features: &[f32]) -> Result<Vec<f32>, TrustGateError> {
    let mut bytes = vec![0u8; features.len() * 4];
    getrandom::getrandom(&mut bytes)
        .map_err(|err| TrustGateError::Model(format!("entropy source unavailable: {err}")))?;
    Ok(features
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let chunk = [
                bytes[index * 4],
                bytes[index * 4 + 1],
                bytes[index * 4 + 2],
                bytes[index * 4 + 3],
            ];
            let uniform = u32::from_le_bytes(chunk) as f64 / u32::MAX as f64;
            let noise = (uniform * 2.0 - 1.0) as f32;
            value + noise
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::EnergyStatsExtractor;
    use tempfile::tempdir;

    fn tone(amplitude: i16, period: usize) -> AudioSample {
        let samples = (0..8_000)
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

    fn open_gate(path: &Path) -> SpeakerTrustGate {
        SpeakerTrustGate::open(path, 0.5, Box::new(EnergyStatsExtractor::default()))
            .expect("gate")
    }

    #[test]
    fn verify_before_enroll_fails_not_trained() {
        let dir = tempdir().expect("tempdir");
        let gate = open_gate(&dir.path().join("speaker.json"));
        let err = gate.verify(&tone(1000, 8)).expect_err("not trained");
        assert!(matches!(err, TrustGateError::NotTrained));
    }

    #[test]
    fn enroll_trains_and_counts_samples() {
        let dir = tempdir().expect("tempdir");
        let mut gate = open_gate(&dir.path().join("speaker.json"));
        assert!(!gate.is_trained());

        gate.enroll(&tone(1000, 8)).expect("first enroll");
        assert!(gate.is_trained());
        assert_eq!(gate.sample_count(), 1);

        gate.enroll(&tone(1100, 8)).expect("second enroll");
        assert_eq!(gate.sample_count(), 2);
    }

    #[test]
    fn enrolled_speaker_verifies_against_own_sample() {
        let dir = tempdir().expect("tempdir");
        let mut gate = open_gate(&dir.path().join("speaker.json"));
        let voice = tone(1000, 8);
        gate.enroll(&voice).expect("enroll");

        let verification = gate.verify(&voice).expect("verify");
        assert!(verification.authorized);
        assert!(verification.confidence >= 0.5);
    }

    #[test]
    fn state_survives_reopen_from_store() {
        let dir = tempdir().expect("tempdir");
        let store = dir.path().join("models/speaker.json");

        let mut gate = open_gate(&store);
        gate.enroll(&tone(1000, 8)).expect("enroll");
        gate.enroll(&tone(1050, 8)).expect("enroll again");
        drop(gate);

        let reopened = open_gate(&store);
        assert!(reopened.is_trained());
        assert_eq!(reopened.sample_count(), 2);
        reopened.verify(&tone(1000, 8)).expect("verify after reopen");
    }

    #[test]
    fn reset_discards_model_and_store() {
        let dir = tempdir().expect("tempdir");
        let store = dir.path().join("speaker.json");

        let mut gate = open_gate(&store);
        gate.enroll(&tone(1000, 8)).expect("enroll");
        gate.reset().expect("reset");
        assert!(!gate.is_trained());
        assert_eq!(gate.sample_count(), 0);
        assert!(matches!(
            gate.verify(&tone(1000, 8)),
            Err(TrustGateError::NotTrained)
        ));

        let reopened = open_gate(&store);
        assert!(!reopened.is_trained());
        assert_eq!(reopened.sample_count(), 0);
    }

    #[test]
    fn empty_sample_surfaces_as_trust_gate_error() {
        let dir = tempdir().expect("tempdir");
        let mut gate = open_gate(&dir.path().join("speaker.json"));
        let empty = AudioSample {
            sample_rate: 16_000,
            samples: Vec::new(),
        };
        assert!(matches!(
            gate.enroll(&empty),
            Err(TrustGateError::Feature(_))
        ));
    }
}
