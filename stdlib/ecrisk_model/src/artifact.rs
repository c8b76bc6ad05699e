//! Model artifact schema, loading and saving.
//!
//! The artifact is a versioned JSON document carrying everything needed to
//! score a patient: the ordered feature list with its preprocessing rules,
//! the fitted Cox coefficients (paired with features by name), an offset
//! and the two cut-points separating the Low/Medium/High risk groups.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{read_to_string, write};
use std::path::Path;

use crate::error::PredictError;

/// Value of the `format` field of every artifact.
pub const ARTIFACT_FORMAT: &str = "ecrisk-cox";

/// Highest `format_version` this crate understands.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Cell texts treated as missing when an artifact does not list its own.
pub const DEFAULT_MISSING_TOKENS: &[&str] = &["NA", "/", "unknown", "？", "nan", "NaN", ""];

pub fn default_missing_tokens() -> Vec<String> {
    DEFAULT_MISSING_TOKENS.iter().map(|s| s.to_string()).collect()
}

fn default_format() -> String {
    ARTIFACT_FORMAT.to_string()
}

fn default_format_version() -> u32 {
    ARTIFACT_FORMAT_VERSION
}

/// Descriptive information about a fitted model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation timestamp (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Fitting library or process that produced the coefficients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Z-score normalisation statistics for a numeric feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub mean: f64,
    pub std: f64,
}

/// How a raw cell becomes the numeric covariate the model was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureEncoding {
    Numeric {
        /// Raw-space value used when the cell is missing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        impute: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale: Option<Scale>,
        /// Final code used when a present cell is not numeric.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invalid_code: Option<f64>,
    },
    Categorical {
        levels: BTreeMap<String, f64>,
        /// Level label used when the cell is missing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        impute: Option<String>,
        /// Code used for labels not listed in `levels`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unknown_code: Option<f64>,
    },
}

impl FeatureEncoding {
    pub fn numeric() -> Self {
        FeatureEncoding::Numeric {
            impute: None,
            scale: None,
            invalid_code: None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FeatureEncoding::Numeric { .. } => "numeric",
            FeatureEncoding::Categorical { .. } => "categorical",
        }
    }
}

/// One model covariate: its input column name and encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(flatten)]
    pub encoding: FeatureEncoding,
}

impl FeatureSpec {
    /// A plain numeric feature with no imputation or scaling.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoding: FeatureEncoding::numeric(),
        }
    }

    pub fn categorical<K, I>(name: impl Into<String>, levels: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        Self {
            name: name.into(),
            encoding: FeatureEncoding::Categorical {
                levels: levels.into_iter().map(|(k, v)| (k.into(), v)).collect(),
                impute: None,
                unknown_code: None,
            },
        }
    }
}

/// A fitted Cox proportional-hazards model ready for prediction.
///
/// Loaded once and shared by reference; nothing in the pipeline mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    #[serde(default)]
    pub metadata: ArtifactMetadata,
    /// Covariates in scoring order.
    pub features: Vec<FeatureSpec>,
    /// Fitted coefficients keyed by feature name.
    pub coefficients: BTreeMap<String, f64>,
    #[serde(default)]
    pub offset: f64,
    /// `[c1, c2]` with `c1 < c2`.
    pub risk_cutpoints: [f64; 2],
    #[serde(default = "default_missing_tokens")]
    pub missing_tokens: Vec<String>,
    /// Input column copied to the output as the patient identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_column: Option<String>,
}

impl ModelArtifact {
    /// Build an artifact in memory and check it.
    pub fn new(
        features: Vec<FeatureSpec>,
        coefficients: BTreeMap<String, f64>,
        offset: f64,
        risk_cutpoints: [f64; 2],
    ) -> Result<Self, PredictError> {
        let artifact = Self {
            format: default_format(),
            format_version: ARTIFACT_FORMAT_VERSION,
            metadata: ArtifactMetadata::default(),
            features,
            coefficients,
            offset,
            risk_cutpoints,
            missing_tokens: default_missing_tokens(),
            id_column: None,
        };
        artifact
            .validate()
            .map_err(|reason| PredictError::ArtifactLoad {
                origin: "<memory>".into(),
                reason,
            })?;
        Ok(artifact)
    }

    /// Read and check an artifact file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PredictError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let text = read_to_string(path).map_err(|e| PredictError::ArtifactLoad {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;
        let artifact = Self::parse(&text, &origin)?;
        log::info!(
            "loaded model artifact '{}' v{} with {} features from {}",
            artifact.metadata.name,
            artifact.metadata.version,
            artifact.features.len(),
            origin
        );
        Ok(artifact)
    }

    pub fn from_json_str(text: &str) -> Result<Self, PredictError> {
        Self::parse(text, "<memory>")
    }

    fn parse(text: &str, origin: &str) -> Result<Self, PredictError> {
        let artifact =
            serde_json::from_str::<ModelArtifact>(text).map_err(|e| PredictError::ArtifactLoad {
                origin: origin.to_string(),
                reason: format!("malformed artifact: {e}"),
            })?;
        artifact
            .validate()
            .map_err(|reason| PredictError::ArtifactLoad {
                origin: origin.to_string(),
                reason,
            })?;
        Ok(artifact)
    }

    /// Write the artifact as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PredictError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let json = self.to_json_pretty().map_err(|e| PredictError::OutputWrite {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;
        write(path, json).map_err(|e| PredictError::OutputWrite {
            origin,
            reason: e.to_string(),
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Coefficients in feature order, paired by name.
    pub fn ordered_coefficients(&self) -> Result<Vec<f64>, String> {
        self.features
            .iter()
            .map(|f| {
                self.coefficients
                    .get(&f.name)
                    .copied()
                    .ok_or_else(|| format!("no coefficient for feature '{}'", f.name))
            })
            .collect()
    }

    /// Structural checks applied on every load.
    pub fn validate(&self) -> Result<(), String> {
        if self.format != ARTIFACT_FORMAT {
            return Err(format!(
                "unknown artifact format '{}' (expected '{ARTIFACT_FORMAT}')",
                self.format
            ));
        }
        if self.format_version == 0 || self.format_version > ARTIFACT_FORMAT_VERSION {
            return Err(format!(
                "unsupported format_version {} (supported: 1..={ARTIFACT_FORMAT_VERSION})",
                self.format_version
            ));
        }
        if self.features.is_empty() {
            return Err("artifact declares no features".into());
        }

        let mut seen = HashSet::new();
        for feature in &self.features {
            if feature.name.trim().is_empty() {
                return Err("feature with empty name".into());
            }
            if !seen.insert(feature.name.as_str()) {
                return Err(format!("duplicate feature '{}'", feature.name));
            }
            check_encoding(feature)?;
        }

        for name in self.coefficients.keys() {
            if !seen.contains(name.as_str()) {
                return Err(format!("coefficient '{name}' has no matching feature"));
            }
        }
        for (feature, coef) in self.features.iter().zip(self.ordered_coefficients()?) {
            if !coef.is_finite() {
                return Err(format!("coefficient for '{}' is not finite", feature.name));
            }
        }

        if !self.offset.is_finite() {
            return Err("offset is not finite".into());
        }
        let [c1, c2] = self.risk_cutpoints;
        if !c1.is_finite() || !c2.is_finite() {
            return Err("risk cut-points must be finite".into());
        }
        if c1 >= c2 {
            return Err(format!(
                "risk cut-points must be strictly increasing, got [{c1}, {c2}]"
            ));
        }
        Ok(())
    }
}

fn check_encoding(feature: &FeatureSpec) -> Result<(), String> {
    let name = &feature.name;
    match &feature.encoding {
        FeatureEncoding::Numeric {
            impute,
            scale,
            invalid_code,
        } => {
            if impute.is_some_and(|v| !v.is_finite()) {
                return Err(format!("impute value for '{name}' is not finite"));
            }
            if invalid_code.is_some_and(|v| !v.is_finite()) {
                return Err(format!("invalid_code for '{name}' is not finite"));
            }
            if let Some(s) = scale {
                if !s.mean.is_finite() || !s.std.is_finite() {
                    return Err(format!("scale for '{name}' is not finite"));
                }
                if s.std <= 0.0 {
                    return Err(format!("scale std for '{name}' must be > 0"));
                }
            }
        }
        FeatureEncoding::Categorical {
            levels,
            impute,
            unknown_code,
        } => {
            if levels.is_empty() {
                return Err(format!("categorical feature '{name}' has no levels"));
            }
            if let Some((label, _)) = levels.iter().find(|(_, v)| !v.is_finite()) {
                return Err(format!("level '{label}' of '{name}' has a non-finite code"));
            }
            if let Some(label) = impute {
                if !levels.contains_key(label) {
                    return Err(format!(
                        "impute level '{label}' of '{name}' is not a declared level"
                    ));
                }
            }
            if unknown_code.is_some_and(|v| !v.is_finite()) {
                return Err(format!("unknown_code for '{name}' is not finite"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_feature() -> ModelArtifact {
        ModelArtifact::new(
            vec![FeatureSpec::numeric("A"), FeatureSpec::numeric("B")],
            BTreeMap::from([("A".to_string(), 0.5), ("B".to_string(), -0.3)]),
            0.0,
            [1.0, 2.0],
        )
        .unwrap()
    }

    #[test]
    fn coefficients_follow_feature_order_not_map_order() {
        let artifact = ModelArtifact::new(
            vec![FeatureSpec::numeric("Zeta"), FeatureSpec::numeric("Alpha")],
            BTreeMap::from([("Alpha".to_string(), 1.0), ("Zeta".to_string(), 2.0)]),
            0.0,
            [0.0, 1.0],
        )
        .unwrap();
        assert_eq!(artifact.ordered_coefficients().unwrap(), vec![2.0, 1.0]);
    }

    #[test]
    fn rejects_descending_cutpoints() {
        let mut artifact = two_feature();
        artifact.risk_cutpoints = [2.0, 1.0];
        assert!(artifact.validate().unwrap_err().contains("strictly increasing"));
        artifact.risk_cutpoints = [1.0, 1.0];
        assert!(artifact.validate().is_err());
    }

    #[test]
    fn rejects_orphan_coefficient_and_missing_coefficient() {
        let mut artifact = two_feature();
        artifact.coefficients.insert("C".into(), 1.0);
        assert!(artifact.validate().unwrap_err().contains("'C'"));

        let mut artifact = two_feature();
        artifact.coefficients.remove("B");
        assert!(artifact.validate().unwrap_err().contains("'B'"));
    }

    #[test]
    fn rejects_impute_level_not_declared() {
        let mut artifact = two_feature();
        artifact.features[1] = FeatureSpec {
            name: "B".into(),
            encoding: FeatureEncoding::Categorical {
                levels: BTreeMap::from([("x".to_string(), 1.0)]),
                impute: Some("y".into()),
                unknown_code: None,
            },
        };
        assert!(artifact.validate().unwrap_err().contains("impute level 'y'"));
    }

    #[test]
    fn rejects_unknown_format_and_version() {
        let mut artifact = two_feature();
        artifact.format = "pickle".into();
        assert!(artifact.validate().is_err());

        let mut artifact = two_feature();
        artifact.format_version = ARTIFACT_FORMAT_VERSION + 1;
        assert!(artifact.validate().unwrap_err().contains("format_version"));
    }

    #[test]
    fn json_defaults_fill_optional_fields() {
        let artifact = ModelArtifact::from_json_str(
            r#"{
                "features": [{"name": "A", "kind": "numeric"}],
                "coefficients": {"A": 1.5},
                "risk_cutpoints": [0.0, 1.0]
            }"#,
        )
        .unwrap();
        assert_eq!(artifact.format, ARTIFACT_FORMAT);
        assert_eq!(artifact.offset, 0.0);
        assert_eq!(artifact.missing_tokens, default_missing_tokens());
        assert_eq!(artifact.features[0].encoding, FeatureEncoding::numeric());
    }
}
