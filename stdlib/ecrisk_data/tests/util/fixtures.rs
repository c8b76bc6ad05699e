use std::collections::BTreeMap;

use ecrisk_model::{FeatureEncoding, FeatureSpec, ModelArtifact, Scale};

/// Small artifact exercising every encoding rule.
pub fn clinical_model() -> ModelArtifact {
    let features = vec![
        FeatureSpec {
            name: "Age".into(),
            encoding: FeatureEncoding::Numeric {
                impute: Some(60.0),
                scale: Some(Scale {
                    mean: 60.0,
                    std: 10.0,
                }),
                invalid_code: None,
            },
        },
        FeatureSpec {
            name: "Sex".into(),
            encoding: FeatureEncoding::Categorical {
                levels: BTreeMap::from([("Female".to_string(), 0.0), ("Male".to_string(), 1.0)]),
                impute: Some("Male".into()),
                unknown_code: None,
            },
        },
        FeatureSpec {
            name: "ECOG_Score".into(),
            encoding: FeatureEncoding::Numeric {
                impute: None,
                scale: None,
                invalid_code: Some(-1.0),
            },
        },
        FeatureSpec::numeric("Albumin"),
    ];
    let coefficients = BTreeMap::from([
        ("Age".to_string(), 0.5),
        ("Sex".to_string(), 0.25),
        ("ECOG_Score".to_string(), 0.4),
        ("Albumin".to_string(), -0.05),
    ]);
    let mut model = ModelArtifact::new(features, coefficients, 2.0, [0.0, 1.0]).unwrap();
    model.id_column = Some("Patient_ID".into());
    model
}
