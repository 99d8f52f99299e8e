use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::model::{FieldValue, Record};
use crate::error::ModelUnavailable;

// ---------------------------------------------------------------------------
// Prediction – what the model says about one record
// ---------------------------------------------------------------------------

/// Classification result: the predicted class and the model's confidence in
/// it. A pure function of the record's feature signature for a given
/// artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// Probability of the predicted label, in `0.5..=1.0`.
    pub probability: f64,
}

// ---------------------------------------------------------------------------
// Model artifact – a trained logistic classifier, loaded once
// ---------------------------------------------------------------------------

/// The two class labels of the binary classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classes {
    pub negative: String,
    pub positive: String,
}

/// How a raw feature value becomes a number the linear model can consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureEncoding {
    /// Boolean flag → 0.0 / 1.0.
    Binary,
    /// Integer → `(value - center) / scale`.
    Numeric { center: f64, scale: f64 },
    /// Categorical level → its declared numeric code.
    Levels { levels: BTreeMap<String, f64> },
}

/// One model input: which record field it reads, how the value is encoded,
/// and its trained weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub field: String,
    pub weight: f64,
    pub encoding: FeatureEncoding,
}

/// A trained logistic-regression artifact: coefficients plus the feature
/// encoding metadata needed to score a record. Opaque to the rest of the
/// crate; loaded once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: String,
    pub classes: Classes,
    pub intercept: f64,
    pub features: Vec<FeatureSpec>,
}

impl ModelArtifact {
    /// Load and sanity-check an artifact from its JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ModelUnavailable> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ModelUnavailable::new(format!("reading {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Parse and sanity-check an artifact from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ModelUnavailable> {
        let artifact: ModelArtifact = serde_json::from_str(text)
            .map_err(|e| ModelUnavailable::new(format!("parsing artifact: {e}")))?;
        if artifact.features.is_empty() {
            return Err(ModelUnavailable::new("artifact declares no features"));
        }
        for feat in &artifact.features {
            if let FeatureEncoding::Numeric { scale, .. } = feat.encoding {
                if scale == 0.0 {
                    return Err(ModelUnavailable::new(format!(
                        "feature '{}' has zero scale",
                        feat.field
                    )));
                }
            }
        }
        Ok(artifact)
    }

    /// Canonical encoding of the record's feature fields, in artifact
    /// feature order. Two records with equal feature values share a
    /// signature regardless of their row ids; this is the prediction cache
    /// key.
    pub fn signature(&self, record: &Record) -> Result<String, ModelUnavailable> {
        let mut parts = Vec::with_capacity(self.features.len());
        for feat in &self.features {
            let value = record.get(&feat.field).ok_or_else(|| {
                ModelUnavailable::new(format!(
                    "record is missing model feature '{}'",
                    feat.field
                ))
            })?;
            parts.push(value.to_string());
        }
        Ok(parts.join("|"))
    }

    /// Score one record: label plus probability of that label.
    pub fn score(&self, record: &Record) -> Result<Prediction, ModelUnavailable> {
        let mut z = self.intercept;
        for feat in &self.features {
            let value = record.get(&feat.field).ok_or_else(|| {
                ModelUnavailable::new(format!(
                    "record is missing model feature '{}'",
                    feat.field
                ))
            })?;
            z += feat.weight * encode(&feat.encoding, &feat.field, value)?;
        }
        let p_positive = sigmoid(z);
        let (label, probability) = if p_positive >= 0.5 {
            (self.classes.positive.clone(), p_positive)
        } else {
            (self.classes.negative.clone(), 1.0 - p_positive)
        };
        Ok(Prediction { label, probability })
    }
}

fn encode(
    encoding: &FeatureEncoding,
    field: &str,
    value: &FieldValue,
) -> Result<f64, ModelUnavailable> {
    match (encoding, value) {
        (FeatureEncoding::Binary, FieldValue::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        (FeatureEncoding::Numeric { center, scale }, FieldValue::Integer(n)) => {
            Ok((*n as f64 - *center) / *scale)
        }
        (FeatureEncoding::Levels { levels }, FieldValue::Categorical(s)) => {
            levels.get(s).copied().ok_or_else(|| {
                ModelUnavailable::new(format!("feature '{field}': no code for level '{s}'"))
            })
        }
        _ => Err(ModelUnavailable::new(format!(
            "feature '{field}': value {value} does not fit its declared encoding"
        ))),
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
