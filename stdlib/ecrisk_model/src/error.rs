//! Error taxonomy shared by every stage of the prediction pipeline.

use thiserror::Error;

/// Errors raised while loading a model, reading input, validating records,
/// scoring, or writing results.
///
/// Each variant maps to one pipeline stage; see [`PredictError::kind`] and
/// [`PredictError::exit_code`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("cannot load model artifact '{origin}': {reason}")]
    ArtifactLoad { origin: String, reason: String },

    #[error("cannot read input '{origin}': {reason}")]
    InputRead { origin: String, reason: String },

    #[error("missing required feature(s) [{}]{}", .columns.join(", "), row_suffix(.row))]
    MissingFeature {
        row: Option<usize>,
        columns: Vec<String>,
    },

    #[error("invalid value '{value}' in column '{column}'{}: {reason}", row_suffix(.row))]
    InvalidValue {
        row: Option<usize>,
        column: String,
        value: String,
        reason: String,
    },

    #[error("cannot write output '{origin}': {reason}")]
    OutputWrite { origin: String, reason: String },

    #[error("invalid configuration '{origin}': {reason}")]
    Config { origin: String, reason: String },

    #[error("{} row(s) rejected{}", .errors.len(), first_suffix(.errors))]
    RowsRejected { errors: Vec<PredictError> },
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(r) => format!(" at row {r}"),
        None => String::new(),
    }
}

fn first_suffix(errors: &[PredictError]) -> String {
    match errors.first() {
        Some(e) => format!("; first: {e}"),
        None => String::new(),
    }
}

impl PredictError {
    /// Taxonomy name used in user-facing messages and error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::ArtifactLoad { .. } => "ArtifactLoadError",
            PredictError::InputRead { .. } => "InputReadError",
            PredictError::MissingFeature { .. } => "MissingFeatureError",
            PredictError::InvalidValue { .. } => "InvalidValueError",
            PredictError::OutputWrite { .. } => "OutputWriteError",
            PredictError::Config { .. } => "ConfigError",
            PredictError::RowsRejected { errors } => {
                errors.first().map(|e| e.kind()).unwrap_or("ValidationError")
            }
        }
    }

    /// Pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            PredictError::ArtifactLoad { .. } => "load",
            PredictError::InputRead { .. } => "read",
            PredictError::MissingFeature { .. }
            | PredictError::InvalidValue { .. }
            | PredictError::RowsRejected { .. } => "validate",
            PredictError::OutputWrite { .. } => "write",
            PredictError::Config { .. } => "config",
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PredictError::Config { .. } => 2,
            PredictError::ArtifactLoad { .. } => 3,
            PredictError::InputRead { .. } => 4,
            PredictError::MissingFeature { .. }
            | PredictError::InvalidValue { .. }
            | PredictError::RowsRejected { .. } => 5,
            PredictError::OutputWrite { .. } => 6,
        }
    }

    /// Row the error refers to, if it is a row-level error.
    pub fn row(&self) -> Option<usize> {
        match self {
            PredictError::MissingFeature { row, .. } | PredictError::InvalidValue { row, .. } => {
                *row
            }
            _ => None,
        }
    }

    /// Column(s) the error refers to, comma separated.
    pub fn column(&self) -> Option<String> {
        match self {
            PredictError::MissingFeature { columns, .. } => Some(columns.join(",")),
            PredictError::InvalidValue { column, .. } => Some(column.clone()),
            _ => None,
        }
    }

    /// Attach a row number to a row-level error. Other variants are returned unchanged.
    pub fn at_row(self, row: usize) -> Self {
        match self {
            PredictError::MissingFeature { columns, .. } => PredictError::MissingFeature {
                row: Some(row),
                columns,
            },
            PredictError::InvalidValue {
                column,
                value,
                reason,
                ..
            } => PredictError::InvalidValue {
                row: Some(row),
                column,
                value,
                reason,
            },
            other => other,
        }
    }
}
