//! Prediction tables and error reports.
//!
//! Files are written to a temporary file beside the destination and renamed
//! into place, so a failed run never leaves a half-written table.

use std::fs::{create_dir_all, File};
use std::io;
use std::path::{Path, PathBuf};

use ecrisk_model::{PredictError, PredictionResult, RiskGroup, OUTPUT_COLUMNS};
use tempfile::NamedTempFile;

/// File name used when the output path names a directory.
pub const DEFAULT_OUTPUT_FILE: &str = "predictions_with_risk.csv";

const SOURCE_ROW: &str = OUTPUT_COLUMNS[0];
const RISK_SCORE: &str = OUTPUT_COLUMNS[1];
const PARTIAL_HAZARD: &str = OUTPUT_COLUMNS[2];
const RISK_GROUP: &str = OUTPUT_COLUMNS[3];

/// Resolve `--output`: an existing directory or an extension-less path is a
/// directory receiving [`DEFAULT_OUTPUT_FILE`]; anything else is the file.
pub fn resolve_output_path(base: &Path) -> PathBuf {
    if base.is_dir() || base.extension().is_none() {
        base.join(DEFAULT_OUTPUT_FILE)
    } else {
        base.to_path_buf()
    }
}

/// `<dir>/<stem>.errors.csv` beside a prediction table.
pub fn error_report_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("predictions");
    output.with_file_name(format!("{stem}.errors.csv"))
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// A temporary file created with the mode `File::create` would use
/// (0o666 less the umask) rather than the owner-only default.
fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".ecrisk-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

fn write_atomically<F>(path: &Path, fill: F) -> Result<(), PredictError>
where
    F: FnOnce(&mut csv::Writer<&mut File>) -> csv::Result<()>,
{
    let origin = path.display().to_string();
    let out_err = |reason: String| PredictError::OutputWrite {
        origin: origin.clone(),
        reason,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    create_dir_all(&dir).map_err(|e| out_err(format!("create_dir_all {}: {e}", dir.display())))?;

    let mut tmp = temp_file_in(&dir).map_err(|e| out_err(e.to_string()))?;
    {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter_for(path))
            .from_writer(tmp.as_file_mut());
        fill(&mut wtr).map_err(|e| out_err(e.to_string()))?;
        wtr.flush().map_err(|e| out_err(e.to_string()))?;
    }
    tmp.persist(path).map_err(|e| out_err(e.error.to_string()))?;
    Ok(())
}

/// Write one row per result, in the given order.
///
/// `columns` names the carried input cells in each result's `inputs`; they
/// come first, followed by [`OUTPUT_COLUMNS`].
pub fn write_predictions(
    path: &Path,
    columns: &[String],
    results: &[PredictionResult],
) -> Result<(), PredictError> {
    write_atomically(path, |wtr| {
        let header: Vec<&str> = columns
            .iter()
            .map(String::as_str)
            .chain(OUTPUT_COLUMNS)
            .collect();
        wtr.write_record(&header)?;

        for r in results {
            let mut record: Vec<String> = Vec::with_capacity(header.len());
            record.extend(r.inputs.iter().cloned());
            record.push(r.source_row.to_string());
            record.push(r.risk_score.to_string());
            record.push(r.partial_hazard.to_string());
            record.push(r.risk_group.to_string());
            wtr.write_record(&record)?;
        }
        Ok(())
    })?;
    log::info!("wrote {} prediction(s) to {}", results.len(), path.display());
    Ok(())
}

/// Write `source_row,kind,column,message` for every rejected row.
pub fn write_error_report(path: &Path, errors: &[PredictError]) -> Result<(), PredictError> {
    write_atomically(path, |wtr| {
        wtr.write_record(["source_row", "kind", "column", "message"])?;
        for e in errors {
            wtr.write_record([
                e.row().map(|r| r.to_string()).unwrap_or_default(),
                e.kind().to_string(),
                e.column().unwrap_or_default(),
                e.to_string(),
            ])?;
        }
        Ok(())
    })?;
    log::info!("wrote {} error(s) to {}", errors.len(), path.display());
    Ok(())
}

/// A prediction table read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    /// Carried input columns, in file order.
    pub columns: Vec<String>,
    pub results: Vec<PredictionResult>,
}

/// Read a table written by [`write_predictions`]. `id_column`, when it is
/// one of the carried columns, fills each result's `patient_id`.
pub fn read_predictions(
    path: &Path,
    id_column: Option<&str>,
) -> Result<PredictionTable, PredictError> {
    let origin = path.display().to_string();
    let input_err = |reason: String| PredictError::InputRead {
        origin: origin.clone(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .from_path(path)
        .map_err(|e| input_err(e.to_string()))?;
    let headers = rdr.headers().map_err(|e| input_err(e.to_string()))?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| input_err(format!("missing column '{name}'")))
    };
    let row_i = position(SOURCE_ROW)?;
    let score_i = position(RISK_SCORE)?;
    let hazard_i = position(PARTIAL_HAZARD)?;
    let group_i = position(RISK_GROUP)?;
    let input_i: Vec<usize> = (0..headers.len())
        .filter(|&i| !OUTPUT_COLUMNS.contains(&&headers[i]))
        .collect();
    let id_i = id_column.and_then(|name| {
        input_i
            .iter()
            .copied()
            .find(|&i| &headers[i] == name)
    });

    let mut results = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let record = rec.map_err(|e| input_err(e.to_string()))?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        let bad = |what: &str, e: String| {
            input_err(format!("line {}: bad {what}: {e}", idx + 2))
        };

        results.push(PredictionResult {
            source_row: field(row_i)
                .parse()
                .map_err(|e: std::num::ParseIntError| bad(SOURCE_ROW, e.to_string()))?,
            patient_id: id_i
                .map(field)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            inputs: input_i.iter().map(|&i| field(i).to_string()).collect(),
            risk_score: field(score_i)
                .parse()
                .map_err(|e: std::num::ParseFloatError| bad(RISK_SCORE, e.to_string()))?,
            partial_hazard: field(hazard_i)
                .parse()
                .map_err(|e: std::num::ParseFloatError| bad(PARTIAL_HAZARD, e.to_string()))?,
            risk_group: field(group_i)
                .parse::<RiskGroup>()
                .map_err(|e| bad(RISK_GROUP, e))?,
        });
    }

    Ok(PredictionTable {
        columns: input_i.iter().map(|&i| headers[i].to_string()).collect(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_resolution() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_output_path(tmp.path()),
            tmp.path().join(DEFAULT_OUTPUT_FILE)
        );
        assert_eq!(
            resolve_output_path(Path::new("prediction_results")),
            Path::new("prediction_results").join(DEFAULT_OUTPUT_FILE)
        );
        assert_eq!(
            resolve_output_path(Path::new("out/risk.tsv")),
            PathBuf::from("out/risk.tsv")
        );
    }

    #[cfg(unix)]
    #[test]
    fn written_files_get_the_default_create_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let reference = tmp.path().join("reference.txt");
        File::create(&reference).unwrap();
        let expected = reference.metadata().unwrap().permissions().mode() & 0o777;

        let table = tmp.path().join("out.csv");
        write_predictions(&table, &[], &[]).unwrap();
        let report = error_report_path(&table);
        write_error_report(&report, &[]).unwrap();

        for path in [&table, &report] {
            let mode = path.metadata().unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, expected, "{}", path.display());
        }
    }

    #[test]
    fn error_report_sits_beside_output() {
        assert_eq!(
            error_report_path(Path::new("out/predictions_with_risk.csv")),
            PathBuf::from("out/predictions_with_risk.errors.csv")
        );
    }
}
