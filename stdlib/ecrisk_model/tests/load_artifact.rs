use ecrisk_model::{FeatureEncoding, ModelArtifact, PredictError};
use pretty_assertions::assert_eq;

const ARTIFACT: &str = r#"{
    "format": "ecrisk-cox",
    "format_version": 1,
    "metadata": {"name": "esca-demo", "version": "1.0.0"},
    "features": [
        {"name": "Age", "kind": "numeric", "impute": 63.0},
        {"name": "Sex", "kind": "categorical", "levels": {"Female": 0.0, "Male": 1.0}, "impute": "Male"}
    ],
    "coefficients": {"Sex": 0.2, "Age": 0.02},
    "offset": -1.3,
    "risk_cutpoints": [-0.2, 0.3],
    "id_column": "Patient_ID"
}"#;

#[test]
fn load_artifact_from_json_file() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let path = tmp.path().join("model.json");
    std::fs::write(&path, ARTIFACT).expect("write");

    let model = ModelArtifact::load(&path).expect("load");
    assert_eq!(model.metadata.name, "esca-demo");
    assert_eq!(model.feature_names().collect::<Vec<_>>(), vec!["Age", "Sex"]);
    assert_eq!(model.ordered_coefficients().unwrap(), vec![0.02, 0.2]);
    assert_eq!(model.id_column.as_deref(), Some("Patient_ID"));
    assert!(matches!(
        model.feature("Sex").unwrap().encoding,
        FeatureEncoding::Categorical { .. }
    ));
}

#[test]
fn missing_file_is_artifact_load_error() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let path = tmp.path().join("nope.json");
    let err = ModelArtifact::load(&path).unwrap_err();
    assert!(matches!(err, PredictError::ArtifactLoad { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn missing_keys_are_artifact_load_errors() {
    let err = ModelArtifact::from_json_str(r#"{"features": [], "coefficients": {}}"#).unwrap_err();
    assert_eq!(err.kind(), "ArtifactLoadError");
    assert!(err.to_string().contains("risk_cutpoints"));

    let err = ModelArtifact::from_json_str("not json").unwrap_err();
    assert_eq!(err.kind(), "ArtifactLoadError");
}

#[test]
fn unsupported_kind_is_rejected() {
    let text = ARTIFACT.replace(r#""kind": "numeric""#, r#""kind": "spline""#);
    let err = ModelArtifact::from_json_str(&text).unwrap_err();
    assert!(matches!(err, PredictError::ArtifactLoad { .. }));
}

#[test]
fn save_then_load_round_trips() {
    let tmp = tempfile::tempdir().expect("tmpdir");
    let model = ModelArtifact::from_json_str(ARTIFACT).expect("parse");
    let path = tmp.path().join("copy.json");
    model.save(&path).expect("save");
    let again = ModelArtifact::load(&path).expect("reload");
    assert_eq!(again, model);
}
