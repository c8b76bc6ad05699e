//! The batch pipeline behind `predict`:
//! load → read → validate → compute → classify → write.

use std::path::PathBuf;

use ecrisk_data::{
    error_report_path, read_table, resolve_output_path, validate_table, write_error_report,
    write_predictions, ReadOptions,
};
use ecrisk_model::{predict_batch, ModelArtifact, PredictError, RiskGroup};

use crate::config::PredictOptions;
use crate::context::Context;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub output: PathBuf,
    /// Written only when rows were skipped.
    pub error_report: Option<PathBuf>,
    pub total_rows: usize,
    pub written: usize,
    pub rejected_rows: usize,
    /// Row errors left out of the output under `skip_invalid`.
    pub skipped: Vec<PredictError>,
    pub counts: Vec<(RiskGroup, usize)>,
}

pub fn run_predict(ctx: &Context, opts: &PredictOptions) -> Result<RunSummary, PredictError> {
    let artifact = ModelArtifact::load(&opts.model)?;
    ctx.verbose(&format!(
        "Loaded model '{}' ({} features) from {}",
        artifact.metadata.name,
        artifact.features.len(),
        opts.model.display()
    ));
    let names: Vec<&str> = artifact.features.iter().map(|f| f.name.as_str()).collect();
    ctx.info(&format!(
        "Model features ({}): {}",
        names.len(),
        names.join(", ")
    ));

    let read_options = ReadOptions {
        sheet: opts.sheet.clone(),
    };
    let table = read_table(&opts.input, &read_options)?;
    ctx.verbose(&format!(
        "Read {} row(s) from {}",
        table.len(),
        opts.input.display()
    ));

    let id_column = opts.id_column.as_deref().or(artifact.id_column.as_deref());
    let report = validate_table(&table, &artifact, id_column)?;
    let total_rows = report.total_rows;

    let mut errors = report.errors;
    if !errors.is_empty() && !opts.skip_invalid {
        return Err(PredictError::RowsRejected { errors });
    }

    let batch = predict_batch(&artifact, &report.records, opts.grouping)?;
    errors.extend(batch.errors.iter().cloned());
    errors.sort_by_key(|e| e.row());
    if !errors.is_empty() && !opts.skip_invalid {
        return Err(PredictError::RowsRejected { errors });
    }

    let output = resolve_output_path(&opts.output);
    write_predictions(&output, &report.columns, &batch.results)?;

    let error_report = if errors.is_empty() {
        None
    } else {
        let path = error_report_path(&output);
        write_error_report(&path, &errors)?;
        Some(path)
    };

    let mut rejected: Vec<usize> = errors.iter().filter_map(|e| e.row()).collect();
    rejected.dedup();
    let counts = RiskGroup::ALL
        .iter()
        .map(|&g| (g, batch.count(g)))
        .collect();

    Ok(RunSummary {
        output,
        error_report,
        total_rows,
        written: batch.results.len(),
        rejected_rows: rejected.len(),
        skipped: errors,
        counts,
    })
}

/// Print an error to stderr as `error: <stage>: <detail>` followed by up
/// to `max_rows` rejected rows.
pub fn report_error(err: &PredictError, max_rows: usize) {
    eprintln!("error: {}: {}: {err}", err.stage(), err.kind());
    if let PredictError::RowsRejected { errors } = err {
        for e in errors.iter().take(max_rows) {
            eprintln!("  {}: {e}", e.kind());
        }
        if errors.len() > max_rows {
            eprintln!("  ... and {} more", errors.len() - max_rows);
        }
    }
}

/// Print per-row problems that were skipped, same cap as [`report_error`].
pub fn warn_skipped(errors: &[PredictError], max_rows: usize) {
    for e in errors.iter().take(max_rows) {
        eprintln!("warning: skipped: {}: {e}", e.kind());
    }
    if errors.len() > max_rows {
        eprintln!("warning: ... and {} more", errors.len() - max_rows);
    }
}
