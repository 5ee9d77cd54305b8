use super::classifier::{CentroidClassifier, FeatureScaler};
use super::TrustGateError;
use crate::shared::fs_atomic::atomic_write_file;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything the gate needs to come back after a restart, in one blob:
/// model, scaler, counters, threshold. Written after every successful
/// enrollment; absent file means untrained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrustSnapshot {
    pub sample_count: u64,
    pub is_trained: bool,
    pub threshold: f64,
    pub scaler: FeatureScaler,
    pub classifier: CentroidClassifier,
}

pub fn load_snapshot(path: &Path) -> Result<Option<TrustSnapshot>, TrustGateError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(TrustGateError::Store {
                path: path.display().to_string(),
                source,
            })
        }
    };
    let snapshot =
        serde_json::from_str(&raw).map_err(|source| TrustGateError::StoreParse {
            path: path.display().to_string(),
            source,
        })?;
    Ok(Some(snapshot))
}

pub fn save_snapshot(path: &Path, snapshot: &TrustSnapshot) -> Result<(), TrustGateError> {
    let encoded =
        serde_json::to_vec_pretty(snapshot).map_err(|source| TrustGateError::StoreEncode {
            path: path.display().to_string(),
            source,
        })?;
    atomic_write_file(path, &encoded).map_err(|source| TrustGateError::Store {
        path: path.display().to_string(),
        source,
    })
}

pub fn remove_snapshot(path: &Path) -> Result<(), TrustGateError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(TrustGateError::Store {
            path: path.display().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::super::classifier::SpeakerClass;
    use super::*;
    use tempfile::tempdir;

    fn snapshot() -> TrustSnapshot {
        let rows = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let labels = [SpeakerClass::Enrolled, SpeakerClass::Impostor];
        TrustSnapshot {
            sample_count: 3,
            is_trained: true,
            threshold: 0.5,
            scaler: FeatureScaler::fit(&rows).expect("scaler"),
            classifier: CentroidClassifier::fit(&rows, &labels).expect("classifier"),
        }
    }

    #[test]
    fn missing_store_reads_as_none() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_snapshot(&dir.path().join("speaker.json")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("models/speaker.json");
        let original = snapshot();
        save_snapshot(&path, &original).expect("save");
        let loaded = load_snapshot(&path).expect("load").expect("present");
        assert_eq!(loaded, original);
    }

    #[test]
    fn corrupt_store_is_a_parse_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("speaker.json");
        fs::write(&path, "not json").expect("write");
        let err = load_snapshot(&path).expect_err("corrupt");
        assert!(matches!(err, TrustGateError::StoreParse { .. }));
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("speaker.json");
        save_snapshot(&path, &snapshot()).expect("save");
        remove_snapshot(&path).expect("first remove");
        remove_snapshot(&path).expect("second remove");
        assert!(load_snapshot(&path).expect("load").is_none());
    }
}
