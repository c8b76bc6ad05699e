//! Aligning a patient table with a model artifact and encoding every row.
//!
//! Row problems are collected rather than failing on the first one; the
//! caller decides whether a report with errors aborts the run.

use std::collections::HashMap;

use ecrisk_model::{EncodedRecord, ModelArtifact, PredictError, OUTPUT_COLUMNS};

use crate::table::Table;

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Rows that encoded cleanly, in input order.
    pub records: Vec<EncodedRecord>,
    /// Row-level `MissingFeature` / `InvalidValue` errors, in input order.
    pub errors: Vec<PredictError>,
    /// Identifier column actually found in the input.
    pub id_column: Option<String>,
    /// Input columns copied to the output, in input order.
    pub columns: Vec<String>,
    pub total_rows: usize,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of distinct rows with at least one error.
    pub fn rejected_rows(&self) -> usize {
        let mut rows: Vec<usize> = self.errors.iter().filter_map(|e| e.row()).collect();
        rows.dedup();
        rows.len()
    }

    /// All records, or every collected error when any row failed.
    pub fn into_records(self) -> Result<Vec<EncodedRecord>, PredictError> {
        if self.errors.is_empty() {
            Ok(self.records)
        } else {
            Err(PredictError::RowsRejected {
                errors: self.errors,
            })
        }
    }
}

/// Column index of every model feature, or one error naming all absent columns.
pub fn align_columns(table: &Table, artifact: &ModelArtifact) -> Result<Vec<usize>, PredictError> {
    let mut indices = Vec::with_capacity(artifact.features.len());
    let mut missing = Vec::new();
    for name in artifact.feature_names() {
        match table.column_index(name) {
            Some(i) => indices.push(i),
            None => missing.push(name.to_string()),
        }
    }
    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(PredictError::MissingFeature {
            row: None,
            columns: missing,
        })
    }
}

/// Validate and encode every row of `table`.
///
/// Fails up front when a required column is absent from the header or when
/// `id_column` names one of the computed output columns. An `id_column` that
/// is not in the header is ignored.
pub fn validate_table(
    table: &Table,
    artifact: &ModelArtifact,
    id_column: Option<&str>,
) -> Result<ValidationReport, PredictError> {
    if let Some(name) = id_column.filter(|n| OUTPUT_COLUMNS.contains(n)) {
        return Err(PredictError::Config {
            origin: "id_column".into(),
            reason: format!("'{name}' is reserved for a computed output column"),
        });
    }
    let indices = align_columns(table, artifact)?;
    let by_name: HashMap<&str, usize> = artifact.feature_names().zip(indices).collect();

    let id_index = match id_column {
        Some(name) => {
            let idx = table.column_index(name);
            if idx.is_none() {
                log::warn!("identifier column '{name}' not found in {}", table.origin);
            }
            idx.map(|i| (name, i))
        }
        None => None,
    };

    let mut carried = Vec::with_capacity(table.headers.len());
    for (i, header) in table.headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        if OUTPUT_COLUMNS.contains(&header.as_str()) {
            log::warn!("input column '{header}' is replaced by the computed value");
            continue;
        }
        carried.push(i);
    }
    let passthrough: Vec<&str> = carried
        .iter()
        .map(|&i| table.headers[i].as_str())
        .filter(|h| !by_name.contains_key(h) && Some(*h) != id_column)
        .collect();
    if !passthrough.is_empty() {
        log::debug!("passing through non-model column(s): {}", passthrough.join(", "));
    }

    let mut report = ValidationReport {
        id_column: id_index.map(|(name, _)| name.to_string()),
        columns: carried.iter().map(|&i| table.headers[i].clone()).collect(),
        total_rows: table.rows.len(),
        ..ValidationReport::default()
    };

    for row in &table.rows {
        let encoded = artifact.encode_row(|name| by_name.get(name).map(|&i| &row.cells[i]));
        match encoded {
            Ok(features) => {
                let patient_id = id_index.and_then(|(_, i)| {
                    let cell = &row.cells[i];
                    let text = cell.as_text();
                    (!text.is_empty()).then(|| text.into_owned())
                });
                report.records.push(EncodedRecord {
                    source_row: row.number,
                    patient_id,
                    inputs: carried
                        .iter()
                        .map(|&i| row.cells[i].as_text().into_owned())
                        .collect(),
                    features,
                });
            }
            Err(errors) => {
                for e in errors {
                    log::debug!("{e}");
                    report.errors.push(e.at_row(row.number));
                }
            }
        }
    }

    log::info!(
        "validated {} row(s): {} accepted, {} rejected",
        report.total_rows,
        report.records.len(),
        report.rejected_rows()
    );
    Ok(report)
}
