use approx::assert_relative_eq;
use ecrisk_data::{read_delimited, read_table, validate_table, ReadOptions};
use ecrisk_model::{predict_batch, Grouping, PredictError, RiskGroup};
use pretty_assertions::assert_eq;

#[path = "util/fixtures.rs"]
mod fixtures;

const COHORT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/cohort.csv");

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn cohort_rows_encode_impute_and_reject() {
    init_logger();
    let model = fixtures::clinical_model();
    let table = read_table(COHORT, &ReadOptions::default()).expect("read cohort");
    let report = validate_table(&table, &model, model.id_column.as_deref()).expect("aligned");

    assert_eq!(report.total_rows, 5);
    assert_eq!(report.id_column.as_deref(), Some("Patient_ID"));
    let rows: Vec<usize> = report.records.iter().map(|r| r.source_row).collect();
    assert_eq!(rows, vec![2, 3, 4, 5]);

    // every input column is carried, survival columns included
    assert_eq!(
        report.columns,
        vec!["Patient_ID", "Age", "Sex", "ECOG_Score", "Albumin", "OS_Time", "Event"]
    );
    assert_eq!(
        report.records[1].inputs,
        vec!["P002", "", "Female", "0", "45", "30", "0"]
    );

    // P002: missing Age imputed to the mean, so z = 0
    assert_eq!(report.records[1].features.values()[0], 0.0);
    // P003: missing Sex imputed to Male, non-numeric ECOG coded -1
    assert_eq!(report.records[2].features.values()[1], 1.0);
    assert_eq!(report.records[2].features.values()[2], -1.0);

    assert_eq!(report.rejected_rows(), 1);
    assert_eq!(
        report.errors,
        vec![
            PredictError::InvalidValue {
                row: Some(6),
                column: "Sex".into(),
                value: "X".into(),
                reason: "unknown level (expected one of: Female, Male)".into(),
            },
            PredictError::MissingFeature {
                row: Some(6),
                columns: vec!["Albumin".into()],
            },
        ]
    );
}

#[test]
fn cohort_scores_and_groups() {
    let model = fixtures::clinical_model();
    let table = read_table(COHORT, &ReadOptions::default()).unwrap();
    let report = validate_table(&table, &model, Some("Patient_ID")).unwrap();
    let batch = predict_batch(&model, &report.records, Grouping::Cutpoints).unwrap();

    let expected = [
        ("P001", 1.15, RiskGroup::High),
        ("P002", -0.25, RiskGroup::Low),
        ("P003", -0.55, RiskGroup::Low),
        ("P004", 0.8, RiskGroup::Medium),
    ];
    assert_eq!(batch.results.len(), expected.len());
    for (result, (id, score, group)) in batch.results.iter().zip(expected) {
        assert_eq!(result.patient_id.as_deref(), Some(id));
        assert_relative_eq!(result.risk_score, score, epsilon = 1e-9);
        assert_eq!(result.risk_group, group);
    }
}

#[test]
fn absent_column_fails_the_batch_naming_every_column() {
    let model = fixtures::clinical_model();
    let text = "Patient_ID,Age,Sex\nP1,60,Male\n";
    let table = read_delimited(text.as_bytes(), b',', "mem.csv").unwrap();
    let err = validate_table(&table, &model, None).unwrap_err();
    assert_eq!(
        err,
        PredictError::MissingFeature {
            row: None,
            columns: vec!["ECOG_Score".into(), "Albumin".into()],
        }
    );
}

#[test]
fn missing_cell_without_imputation_is_never_defaulted() {
    let model = fixtures::clinical_model();
    let text = "Age,Sex,ECOG_Score,Albumin\n60,Male,,40\n";
    let table = read_delimited(text.as_bytes(), b',', "mem.csv").unwrap();
    let report = validate_table(&table, &model, None).unwrap();
    assert!(report.records.is_empty());
    let err = report.into_records().unwrap_err();
    match err {
        PredictError::RowsRejected { errors } => {
            assert_eq!(
                errors,
                vec![PredictError::MissingFeature {
                    row: Some(2),
                    columns: vec!["ECOG_Score".into()],
                }]
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unknown_id_column_is_ignored() {
    let model = fixtures::clinical_model();
    let text = "Age,Sex,ECOG_Score,Albumin\n60,Male,1,40\n";
    let table = read_delimited(text.as_bytes(), b',', "mem.csv").unwrap();
    let report = validate_table(&table, &model, Some("MRN")).unwrap();
    assert_eq!(report.id_column, None);
    assert_eq!(report.records[0].patient_id, None);
}

#[test]
fn computed_column_names_are_not_identifiers() {
    let model = fixtures::clinical_model();
    let text = "risk_score,Age,Sex,ECOG_Score,Albumin\nR1,60,Male,1,40\n";
    let table = read_delimited(text.as_bytes(), b',', "mem.csv").unwrap();
    for name in ["source_row", "risk_score", "partial_hazard", "risk_group"] {
        let err = validate_table(&table, &model, Some(name)).unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
        assert_eq!(err.exit_code(), 2);
    }
}

#[test]
fn input_column_named_like_an_output_is_not_carried() {
    init_logger();
    let model = fixtures::clinical_model();
    let text = "Patient_ID,Age,Sex,ECOG_Score,Albumin,risk_group\nP1,60,Male,1,40,High\n";
    let table = read_delimited(text.as_bytes(), b',', "mem.csv").unwrap();
    let report = validate_table(&table, &model, Some("Patient_ID")).unwrap();
    assert_eq!(
        report.columns,
        vec!["Patient_ID", "Age", "Sex", "ECOG_Score", "Albumin"]
    );
    assert_eq!(report.records[0].inputs, vec!["P1", "60", "Male", "1", "40"]);
}
