//! Turning raw spreadsheet cells into the covariate vector the model expects.

use std::borrow::Cow;
use std::fmt;

use crate::artifact::{FeatureEncoding, FeatureSpec, ModelArtifact};
use crate::error::PredictError;

/// A raw input cell as read from a CSV or spreadsheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl RawValue {
    /// Whether the cell counts as missing under the artifact's token list.
    pub fn is_missing(&self, missing_tokens: &[String]) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Number(n) => !n.is_finite(),
            RawValue::Text(s) => {
                let t = s.trim();
                t.is_empty() || missing_tokens.iter().any(|m| m == t)
            }
            RawValue::Bool(_) => false,
        }
    }

    /// Trimmed textual form; numbers use their shortest representation (`1`, not `1.0`).
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RawValue::Empty => Cow::Borrowed(""),
            RawValue::Number(n) => Cow::Owned(n.to_string()),
            RawValue::Text(s) => Cow::Borrowed(s.trim()),
            RawValue::Bool(b) => Cow::Owned(b.to_string()),
        }
    }

    fn as_number(&self) -> Option<f64> {
        let n = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
            RawValue::Bool(b) => f64::from(u8::from(*b)),
            RawValue::Empty => return None,
        };
        n.is_finite().then_some(n)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// Encoded covariates in the artifact's feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build a vector from already-encoded values, pairing by feature name.
    pub fn from_named<'a, I>(artifact: &ModelArtifact, pairs: I) -> Result<Self, PredictError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let pairs: Vec<(&str, f64)> = pairs.into_iter().collect();
        let mut values = Vec::with_capacity(artifact.features.len());
        let mut missing = Vec::new();
        for feature in &artifact.features {
            match pairs.iter().find(|(name, _)| *name == feature.name) {
                Some((_, v)) if !v.is_finite() => {
                    return Err(PredictError::InvalidValue {
                        row: None,
                        column: feature.name.clone(),
                        value: v.to_string(),
                        reason: "value is not finite".into(),
                    })
                }
                Some((_, v)) => values.push(*v),
                None => missing.push(feature.name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(PredictError::MissingFeature {
                row: None,
                columns: missing,
            });
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

enum EncodeFailure {
    Missing,
    Invalid(String),
}

impl FeatureSpec {
    /// Encode one cell: impute if missing, map categories, scale numerics.
    pub fn encode(&self, raw: &RawValue, missing_tokens: &[String]) -> Result<f64, PredictError> {
        self.encode_inner(raw, missing_tokens).map_err(|failure| match failure {
            EncodeFailure::Missing => PredictError::MissingFeature {
                row: None,
                columns: vec![self.name.clone()],
            },
            EncodeFailure::Invalid(reason) => PredictError::InvalidValue {
                row: None,
                column: self.name.clone(),
                value: raw.as_text().into_owned(),
                reason,
            },
        })
    }

    fn encode_inner(
        &self,
        raw: &RawValue,
        missing_tokens: &[String],
    ) -> Result<f64, EncodeFailure> {
        let missing = raw.is_missing(missing_tokens);
        match &self.encoding {
            FeatureEncoding::Numeric {
                impute,
                scale,
                invalid_code,
            } => {
                let x = if missing {
                    impute.ok_or(EncodeFailure::Missing)?
                } else {
                    match raw.as_number() {
                        Some(x) => x,
                        // the fallback code is already in model space
                        None => {
                            return invalid_code.ok_or_else(|| {
                                EncodeFailure::Invalid("expected a finite number".into())
                            })
                        }
                    }
                };
                Ok(match scale {
                    Some(s) => (x - s.mean) / s.std,
                    None => x,
                })
            }
            FeatureEncoding::Categorical {
                levels,
                impute,
                unknown_code,
            } => {
                let label = if missing {
                    Cow::Borrowed(impute.as_deref().ok_or(EncodeFailure::Missing)?)
                } else {
                    raw.as_text()
                };
                match levels.get(&*label) {
                    Some(code) => Ok(*code),
                    None => unknown_code.ok_or_else(|| {
                        EncodeFailure::Invalid(format!(
                            "unknown level (expected one of: {})",
                            levels.keys().cloned().collect::<Vec<_>>().join(", ")
                        ))
                    }),
                }
            }
        }
    }
}

impl ModelArtifact {
    /// Encode one input row. `lookup` returns the cell for a column, or
    /// `None` when the column is absent. All problems in the row are returned.
    pub fn encode_row<'r, F>(&self, lookup: F) -> Result<FeatureVector, Vec<PredictError>>
    where
        F: Fn(&str) -> Option<&'r RawValue>,
    {
        let mut values = Vec::with_capacity(self.features.len());
        let mut absent = Vec::new();
        let mut errors = Vec::new();
        for feature in &self.features {
            let Some(raw) = lookup(&feature.name) else {
                absent.push(feature.name.clone());
                continue;
            };
            match feature.encode(raw, &self.missing_tokens) {
                Ok(v) => values.push(v),
                Err(e) => errors.push(e),
            }
        }
        if !absent.is_empty() {
            errors.insert(
                0,
                PredictError::MissingFeature {
                    row: None,
                    columns: absent,
                },
            );
        }
        if errors.is_empty() {
            Ok(FeatureVector { values })
        } else {
            Err(errors)
        }
    }
}
