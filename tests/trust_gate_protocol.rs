use borealis::speech::AudioSample;
use borealis::trust::{EnergyStatsExtractor, SpeakerTrustGate, TrustGateError};
use std::path::Path;
use tempfile::tempdir;

fn voice(amplitude: i16, period: usize) -> AudioSample {
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

fn open_gate(store: &Path, threshold: f64) -> SpeakerTrustGate {
    SpeakerTrustGate::open(store, threshold, Box::new(EnergyStatsExtractor::default()))
        .expect("gate")
}

#[test]
fn verify_before_any_enroll_always_fails_not_trained() {
    let dir = tempdir().expect("tempdir");
    let gate = open_gate(&dir.path().join("speaker.json"), 0.5);
    assert!(matches!(
        gate.verify(&voice(1000, 8)),
        Err(TrustGateError::NotTrained)
    ));
}

#[test]
fn sample_count_grows_with_each_enrollment() {
    let dir = tempdir().expect("tempdir");
    let mut gate = open_gate(&dir.path().join("speaker.json"), 0.5);
    for expected in 1..=4u64 {
        gate.enroll(&voice(1000 + expected as i16 * 10, 8)).expect("enroll");
        assert_eq!(gate.sample_count(), expected);
        assert!(gate.is_trained());
    }
}

#[test]
fn enrolled_sample_verifies_as_authorized_at_default_threshold() {
    let dir = tempdir().expect("tempdir");
    let mut gate = open_gate(&dir.path().join("speaker.json"), 0.5);
    let sample = voice(1000, 8);
    gate.enroll(&sample).expect("enroll");

    let verification = gate.verify(&sample).expect("verify");
    assert!(verification.authorized);
    assert!(verification.confidence > 0.5);
}

#[test]
fn confidence_below_threshold_denies_even_the_predicted_speaker() {
    let dir = tempdir().expect("tempdir");
    // A threshold stricter than the synthetic-negative margin can ever reach.
    let mut gate = open_gate(&dir.path().join("speaker.json"), 0.9999);
    let sample = voice(1000, 8);
    gate.enroll(&sample).expect("enroll");

    let verification = gate.verify(&sample).expect("verify");
    assert!(!verification.authorized);
    assert!(verification.confidence < 0.9999);
}

#[test]
fn snapshot_restores_counters_threshold_and_model_across_reopen() {
    let dir = tempdir().expect("tempdir");
    let store = dir.path().join("models/speaker.json");

    let mut gate = open_gate(&store, 0.6);
    gate.enroll(&voice(1000, 8)).expect("first");
    gate.enroll(&voice(1020, 8)).expect("second");
    drop(gate);

    // A different configured default must not override the persisted profile.
    let reopened = open_gate(&store, 0.3);
    assert!(reopened.is_trained());
    assert_eq!(reopened.sample_count(), 2);
    assert_eq!(reopened.threshold(), 0.6);
    reopened.verify(&voice(1000, 8)).expect("verify");
}

#[test]
fn reset_clears_state_regardless_of_prior_history() {
    let dir = tempdir().expect("tempdir");
    let store = dir.path().join("speaker.json");

    let mut gate = open_gate(&store, 0.5);
    for amplitude in [900, 1000, 1100] {
        gate.enroll(&voice(amplitude, 8)).expect("enroll");
    }
    assert_eq!(gate.sample_count(), 3);

    gate.reset().expect("reset");
    assert_eq!(gate.sample_count(), 0);
    assert!(!gate.is_trained());
    assert!(!store.exists());

    let reopened = open_gate(&store, 0.5);
    assert_eq!(reopened.sample_count(), 0);
    assert!(!reopened.is_trained());
}

#[test]
fn feature_errors_surface_instead_of_a_default_authorization() {
    let dir = tempdir().expect("tempdir");
    let mut gate = open_gate(&dir.path().join("speaker.json"), 0.5);
    gate.enroll(&voice(1000, 8)).expect("enroll");

    let empty = AudioSample {
        sample_rate: 16_000,
        samples: Vec::new(),
    };
    assert!(matches!(
        gate.verify(&empty),
        Err(TrustGateError::Feature(_))
    ));
}

#[test]
fn out_of_range_threshold_refuses_to_open() {
    let dir = tempdir().expect("tempdir");
    let result = SpeakerTrustGate::open(
        &dir.path().join("speaker.json"),
        1.5,
        Box::new(EnergyStatsExtractor::default()),
    );
    assert!(result.is_err());
}
