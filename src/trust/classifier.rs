use super::TrustGateError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerClass {
    Enrolled,
    Impostor,
}

/// Per-dimension standardization fitted on the first enrollment's rows and
/// reused for every later transform, mirroring a scaler that is fitted once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureScaler {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl FeatureScaler {
    pub fn fit(rows: &[Vec<f32>]) -> Result<Self, TrustGateError> {
        let first = rows
            .first()
            .ok_or_else(|| TrustGateError::Model("cannot fit scaler on zero rows".to_string()))?;
        let dim = first.len();
        if rows.iter().any(|row| row.len() != dim) {
            return Err(TrustGateError::Model(
                "feature rows have inconsistent dimensions".to_string(),
            ));
        }

        let count = rows.len() as f32;
        let mut mean = vec![0.0_f32; dim];
        for row in rows {
            for (accumulator, value) in mean.iter_mut().zip(row) {
                *accumulator += value / count;
            }
        }
        let mut std = vec![0.0_f32; dim];
        for row in rows {
            for (index, value) in row.iter().enumerate() {
                let delta = value - mean[index];
                std[index] += delta * delta / count;
            }
        }
        for value in &mut std {
            // Constant dimensions would otherwise divide by zero.
            *value = value.sqrt().max(1e-6);
        }
        Ok(Self { mean, std })
    }

    pub fn transform(&self, features: &[f32]) -> Result<Vec<f32>, TrustGateError> {
        if features.len() != self.mean.len() {
            return Err(TrustGateError::Model(format!(
                "feature dimension {} does not match fitted scaler dimension {}",
                features.len(),
                self.mean.len()
            )));
        }
        Ok(features
            .iter()
            .enumerate()
            .map(|(index, value)| (value - self.mean[index]) / self.std[index])
            .collect())
    }
}

/// Nearest-centroid binary classifier with a logistic score over the distance
/// margin. The simplest model that satisfies the gate's contract (a class
/// prediction plus a calibratable probability); an SVM or similar backend
/// would replace this struct wholesale behind the gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CentroidClassifier {
    enrolled: Vec<f32>,
    impostor: Vec<f32>,
    sharpness: f32,
}

impl CentroidClassifier {
    /// Fit from labeled rows. Both classes must be present; the protocol
    /// guarantees this by pairing every enrollment sample with a synthetic
    /// negative.
    pub fn fit(rows: &[Vec<f32>], labels: &[SpeakerClass]) -> Result<Self, TrustGateError> {
        if rows.len() != labels.len() {
            return Err(TrustGateError::Model(
                "row and label counts differ".to_string(),
            ));
        }
        let enrolled = centroid(rows, labels, SpeakerClass::Enrolled)?;
        let impostor = centroid(rows, labels, SpeakerClass::Impostor)?;
        if enrolled.len() != impostor.len() {
            return Err(TrustGateError::Model(
                "class centroids have inconsistent dimensions".to_string(),
            ));
        }
        Ok(Self {
            enrolled,
            impostor,
            sharpness: 1.0,
        })
    }

    /// Predict a class and the probability of that *predicted* class.
    pub fn predict(&self, features: &[f32]) -> Result<(SpeakerClass, f64), TrustGateError> {
        if features.len() != self.enrolled.len() {
            return Err(TrustGateError::Model(format!(
                "feature dimension {} does not match fitted model dimension {}",
                features.len(),
                self.enrolled.len()
            )));
        }
        let distance_enrolled = euclidean(features, &self.enrolled);
        let distance_impostor = euclidean(features, &self.impostor);
        let margin = (distance_impostor - distance_enrolled) as f64 * self.sharpness as f64;
        let p_enrolled = 1.0 / (1.0 + (-margin).exp());

        if p_enrolled >= 0.5 {
            Ok((SpeakerClass::Enrolled, p_enrolled))
        } else {
            Ok((SpeakerClass::Impostor, 1.0 - p_enrolled))
        }
    }
}

fn centroid(
    rows: &[Vec<f32>],
    labels: &[SpeakerClass],
    class: SpeakerClass,
) -> Result<Vec<f32>, TrustGateError> {
    let members: Vec<&Vec<f32>> = rows
        .iter()
        .zip(labels)
        .filter(|(_, label)| **label == class)
        .map(|(row, _)| row)
        .collect();
    let first = members.first().ok_or_else(|| {
        TrustGateError::Model(format!("no rows labeled {class:?}; need both classes to fit"))
    })?;
    let dim = first.len();
    if members.iter().any(|row| row.len() != dim) {
        return Err(TrustGateError::Model(
            "feature rows have inconsistent dimensions".to_string(),
        ));
    }
    let count = members.len() as f32;
    let mut result = vec![0.0_f32; dim];
    for row in members {
        for (accumulator, value) in result.iter_mut().zip(row) {
            *accumulator += value / count;
        }
    }
    Ok(result)
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
