use serde::{Deserialize, Serialize};

use crate::artifact::ModelArtifact;
use crate::classify::{assign_groups, Grouping, RiskGroup};
use crate::encode::FeatureVector;
use crate::error::PredictError;
use crate::score::CoxScorer;

/// Columns appended to every prediction table, in order.
pub const OUTPUT_COLUMNS: [&str; 4] = ["source_row", "risk_score", "partial_hazard", "risk_group"];

/// A validated, encoded input row.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord {
    /// Spreadsheet row number (header is row 1).
    pub source_row: usize,
    pub patient_id: Option<String>,
    /// Input cells copied to the output as text, one per carried column.
    pub inputs: Vec<String>,
    pub features: FeatureVector,
}

/// One output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub source_row: usize,
    pub patient_id: Option<String>,
    pub inputs: Vec<String>,
    pub risk_score: f64,
    pub partial_hazard: f64,
    pub risk_group: RiskGroup,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Scored rows in input order.
    pub results: Vec<PredictionResult>,
    pub errors: Vec<PredictError>,
}

impl BatchOutcome {
    pub fn count(&self, group: RiskGroup) -> usize {
        self.results.iter().filter(|r| r.risk_group == group).count()
    }
}

/// Score and group a batch. Rows whose score is not finite are reported in
/// `errors` and left out of `results`.
pub fn predict_batch(
    artifact: &ModelArtifact,
    records: &[EncodedRecord],
    grouping: Grouping,
) -> Result<BatchOutcome, PredictError> {
    let scorer = CoxScorer::new(artifact)?;
    let mut scored = Vec::with_capacity(records.len());
    let mut errors = Vec::new();
    for record in records {
        match scorer.score(&record.features) {
            Ok(score) => scored.push((record, score)),
            Err(e) => errors.push(e.at_row(record.source_row)),
        }
    }

    let scores: Vec<f64> = scored.iter().map(|(_, s)| s.risk_score).collect();
    let groups = assign_groups(&scores, grouping, artifact.risk_cutpoints);
    let results = scored
        .into_iter()
        .zip(groups)
        .map(|((record, score), risk_group)| PredictionResult {
            source_row: record.source_row,
            patient_id: record.patient_id.clone(),
            inputs: record.inputs.clone(),
            risk_score: score.risk_score,
            partial_hazard: score.partial_hazard,
            risk_group,
        })
        .collect();
    log::debug!(
        "scored {} of {} record(s) with {grouping} grouping",
        scores.len(),
        records.len()
    );
    Ok(BatchOutcome { results, errors })
}
