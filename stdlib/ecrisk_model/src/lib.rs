//! Cox proportional-hazards risk model for esophageal cancer prognosis.
//!
//! Holds the model artifact schema (features, encodings, coefficients,
//! cut-points), turns raw cells into covariates, computes the log partial
//! hazard and assigns Low/Medium/High risk groups.

pub mod artifact;
pub mod classify;
pub mod encode;
pub mod error;
pub mod prediction;
pub mod score;

pub use artifact::{
    default_missing_tokens, ArtifactMetadata, FeatureEncoding, FeatureSpec, ModelArtifact, Scale,
    ARTIFACT_FORMAT, ARTIFACT_FORMAT_VERSION, DEFAULT_MISSING_TOKENS,
};
pub use classify::{assign_groups, classify, cohort_groups, Grouping, RiskGroup};
pub use encode::{FeatureVector, RawValue};
pub use error::PredictError;
pub use prediction::{
    predict_batch, BatchOutcome, EncodedRecord, PredictionResult, OUTPUT_COLUMNS,
};
pub use score::{CoxScorer, Explanation, FeatureContribution, RiskScore};
