//! Cox linear predictor: `risk_score = offset + Σ β_i · x_i`.

use serde::{Deserialize, Serialize};

use crate::artifact::ModelArtifact;
use crate::encode::FeatureVector;
use crate::error::PredictError;

/// Score for one patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    /// Log partial hazard (the linear predictor).
    pub risk_score: f64,
    /// `exp(risk_score)`
    pub partial_hazard: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub coefficient: f64,
    pub value: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub risk_score: f64,
    pub offset: f64,
    pub contributions: Vec<FeatureContribution>,
}

/// Scores feature vectors against one artifact.
///
/// Coefficients are resolved by feature name once, at construction.
#[derive(Debug, Clone)]
pub struct CoxScorer<'a> {
    artifact: &'a ModelArtifact,
    weights: Vec<f64>,
}

impl<'a> CoxScorer<'a> {
    pub fn new(artifact: &'a ModelArtifact) -> Result<Self, PredictError> {
        let weights = artifact
            .ordered_coefficients()
            .map_err(|reason| PredictError::ArtifactLoad {
                origin: artifact.metadata.name.clone(),
                reason,
            })?;
        Ok(Self { artifact, weights })
    }

    pub fn artifact(&self) -> &'a ModelArtifact {
        self.artifact
    }

    /// Compute the linear predictor. Fails on non-finite input or result.
    pub fn score(&self, features: &FeatureVector) -> Result<RiskScore, PredictError> {
        if features.len() != self.weights.len() {
            return Err(PredictError::InvalidValue {
                row: None,
                column: "<features>".into(),
                value: features.len().to_string(),
                reason: format!("expected {} encoded features", self.weights.len()),
            });
        }
        for (name, x) in self.artifact.feature_names().zip(features.values()) {
            if !x.is_finite() {
                return Err(non_finite(name, *x));
            }
        }

        let risk_score = self.artifact.offset
            + self
                .weights
                .iter()
                .zip(features.values())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        if !risk_score.is_finite() {
            return Err(non_finite("risk_score", risk_score));
        }
        Ok(RiskScore {
            risk_score,
            partial_hazard: risk_score.exp(),
        })
    }

    /// Per-feature contributions to the linear predictor.
    pub fn explain(&self, features: &FeatureVector) -> Explanation {
        let mut contributions = Vec::with_capacity(self.weights.len());
        let mut sum = 0.0;
        for ((name, w), x) in self
            .artifact
            .feature_names()
            .zip(self.weights.iter())
            .zip(features.values())
        {
            let c = w * x;
            contributions.push(FeatureContribution {
                feature: name.to_string(),
                coefficient: *w,
                value: *x,
                contribution: c,
            });
            sum += c;
        }
        Explanation {
            risk_score: sum + self.artifact.offset,
            offset: self.artifact.offset,
            contributions,
        }
    }
}

fn non_finite(column: &str, value: f64) -> PredictError {
    PredictError::InvalidValue {
        row: None,
        column: column.to_string(),
        value: value.to_string(),
        reason: "value is not finite".into(),
    }
}
