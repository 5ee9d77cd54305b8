mod classifier;
mod features;
mod gate;
mod store;

pub use classifier::{CentroidClassifier, FeatureScaler, SpeakerClass};
pub use features::{EnergyStatsExtractor, FeatureExtractor};
pub use gate::{SpeakerTrustGate, Verification};
pub use store::TrustSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum TrustGateError {
    #[error("speaker model is not trained; enroll at least one sample first")]
    NotTrained,
    #[error("feature extraction failed: {0}")]
    Feature(String),
    #[error("speaker model error: {0}")]
    Model(String),
    #[error("failed to access trust store {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid trust store {path}: {source}")]
    StoreParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode trust store {path}: {source}")]
    StoreEncode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
