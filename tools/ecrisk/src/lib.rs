//! Command-line front end: run configuration, the prediction pipeline and
//! artifact assembly shared by the `predict` and `ecrisk-artifact` binaries.

pub mod artifact_spec;
pub mod config;
pub mod context;
pub mod runner;

pub use artifact_spec::{
    build_artifact, describe, load_coefficients, read_coefficients, ArtifactSpec,
};
pub use config::{Overrides, PredictConfig, PredictOptions};
pub use context::{init_logging, Context};
pub use runner::{report_error, run_predict, warn_skipped, RunSummary};
