use std::collections::BTreeMap;

use ecrisk_data::{read_table, validate_table, ReadOptions};
use ecrisk_model::{FeatureSpec, ModelArtifact, PredictError, RawValue};
use pretty_assertions::assert_eq;

const WORKBOOK: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/cohort.xlsx");

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// T_Stage levels are the digits a spreadsheet stores as numbers.
fn staging_model() -> ModelArtifact {
    let features = vec![
        FeatureSpec::numeric("Age"),
        FeatureSpec::categorical("T_Stage", [("1", 0.0), ("2", 1.0), ("3", 2.0)]),
        FeatureSpec::numeric("Albumin"),
    ];
    let coefficients = BTreeMap::from([
        ("Age".to_string(), 0.01),
        ("T_Stage".to_string(), 0.5),
        ("Albumin".to_string(), -0.01),
    ]);
    ModelArtifact::new(features, coefficients, 0.0, [0.5, 1.0]).unwrap()
}

fn sheet(name: Option<&str>) -> ReadOptions {
    ReadOptions {
        sheet: name.map(str::to_string),
    }
}

#[test]
fn first_sheet_header_and_row_numbers() {
    init_logger();
    let table = read_table(WORKBOOK, &sheet(None)).expect("read workbook");

    assert_eq!(
        table.headers,
        vec!["Patient_ID", "Age", "T_Stage", "Albumin", "OS_Time"]
    );
    // row 3 is blank in the sheet
    let numbers: Vec<usize> = table.rows.iter().map(|r| r.number).collect();
    assert_eq!(numbers, vec![2, 4, 5]);

    let first = &table.rows[0];
    assert_eq!(first.cells[0], RawValue::Text("P1".into()));
    assert_eq!(first.cells[2], RawValue::Number(1.0));
    assert_eq!(first.cells[2].as_text(), "1");
    assert_eq!(table.rows[2].cells[4], RawValue::Empty);
}

#[test]
fn numeric_cells_match_categorical_levels() {
    init_logger();
    let model = staging_model();
    let table = read_table(WORKBOOK, &sheet(None)).unwrap();
    let report = validate_table(&table, &model, Some("Patient_ID")).unwrap();

    let rows: Vec<usize> = report.records.iter().map(|r| r.source_row).collect();
    assert_eq!(rows, vec![2, 5]);
    assert_eq!(report.records[0].features.values(), &[61.0, 0.0, 40.5]);
    assert_eq!(report.records[1].features.values(), &[55.0, 1.0, 38.0]);
    assert_eq!(
        report.records[0].inputs,
        vec!["P1", "61", "1", "40.5", "12.5"]
    );
    assert_eq!(report.records[1].inputs, vec!["P3", "55", "2", "38", ""]);

    // the "NA" albumin on row 4 is reported against the sheet's row number
    assert_eq!(
        report.errors,
        vec![PredictError::MissingFeature {
            row: Some(4),
            columns: vec!["Albumin".into()],
        }]
    );
}

#[test]
fn named_sheet_is_read_from_its_own_first_row() {
    let table = read_table(WORKBOOK, &sheet(Some("Followup"))).unwrap();
    assert_eq!(table.headers, vec!["Patient_ID", "Age", "T_Stage", "Albumin"]);
    assert_eq!(table.rows.len(), 1);
    // header sits on row 2, so the only patient is row 3
    assert_eq!(table.rows[0].number, 3);

    let report = validate_table(&table, &staging_model(), Some("Patient_ID")).unwrap();
    assert_eq!(report.records[0].patient_id.as_deref(), Some("F1"));
    assert_eq!(report.records[0].features.values(), &[66.0, 1.0, 41.0]);
}

#[test]
fn unknown_sheet_is_input_read_error() {
    let err = read_table(WORKBOOK, &sheet(Some("Baseline"))).unwrap_err();
    assert_eq!(err.kind(), "InputReadError");
    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("Baseline"), "{err}");
}
