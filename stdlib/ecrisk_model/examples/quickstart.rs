use std::collections::BTreeMap;

use ecrisk_model::{classify, CoxScorer, FeatureSpec, ModelArtifact, RawValue};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Model
    let model = ModelArtifact::new(
        vec![
            FeatureSpec::numeric("Age"),
            FeatureSpec::categorical("Sex", [("Female", 0.0), ("Male", 1.0)]),
        ],
        BTreeMap::from([("Age".to_string(), 0.03), ("Sex".to_string(), 0.25)]),
        -2.0,
        [-0.25, 0.25],
    )?;
    let scorer = CoxScorer::new(&model)?;

    // One patient, raw cells as they would come out of a spreadsheet
    let age = RawValue::Number(67.0);
    let sex = RawValue::from("Male");
    let features = model
        .encode_row(|name| match name {
            "Age" => Some(&age),
            "Sex" => Some(&sex),
            _ => None,
        })
        .map_err(|errs| errs[0].clone())?;

    let score = scorer.score(&features)?;
    let group = classify(score.risk_score, model.risk_cutpoints);
    println!(
        "risk_score={:.3} partial_hazard={:.3} group={group}",
        score.risk_score, score.partial_hazard
    );
    for c in scorer.explain(&features).contributions {
        println!("  {:<6} {:+.3}", c.feature, c.contribution);
    }
    Ok(())
}
