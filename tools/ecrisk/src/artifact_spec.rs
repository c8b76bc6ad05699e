//! Building a model artifact from a TOML feature description and the
//! coefficient table exported by the fitting library.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use ecrisk_model::{
    default_missing_tokens, ArtifactMetadata, FeatureEncoding, FeatureSpec, ModelArtifact,
    PredictError, ARTIFACT_FORMAT, ARTIFACT_FORMAT_VERSION,
};
use serde::{Deserialize, Serialize};

/// Everything in an artifact except the fitted coefficients.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactSpec {
    pub risk_cutpoints: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    /// Training means of the encoded covariates; sets `offset = -Σ β·mean`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub baseline_means: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_tokens: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: ArtifactMetadata,
    pub features: Vec<FeatureSpec>,
}

fn config_error(origin: &str, reason: impl Into<String>) -> PredictError {
    PredictError::Config {
        origin: origin.to_string(),
        reason: reason.into(),
    }
}

impl ArtifactSpec {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, PredictError> {
        let origin = path.display().to_string();
        let text =
            std::fs::read_to_string(path).map_err(|e| config_error(&origin, e.to_string()))?;
        Self::parse(&text).map_err(|e| config_error(&origin, e.message()))
    }
}

/// Read a `covariate,coef` table. Extra columns (standard errors, p-values)
/// are ignored; without a `covariate` header the first column is used.
pub fn read_coefficients<R: Read>(
    reader: R,
    origin: &str,
) -> Result<BTreeMap<String, f64>, PredictError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| config_error(origin, e.to_string()))?
        .clone();
    let name_col = headers.iter().position(|h| h == "covariate").unwrap_or(0);
    let coef_col = headers
        .iter()
        .position(|h| h == "coef")
        .ok_or_else(|| config_error(origin, "coefficient table has no 'coef' column"))?;

    let mut coefficients = BTreeMap::new();
    for (idx, record) in rdr.records().enumerate() {
        let line = idx + 2;
        let record = record.map_err(|e| config_error(origin, e.to_string()))?;
        let name = record.get(name_col).unwrap_or_default();
        let raw = record.get(coef_col).unwrap_or_default();
        if name.is_empty() {
            return Err(config_error(origin, format!("line {line}: empty covariate name")));
        }
        let coef: f64 = raw
            .parse()
            .ok()
            .filter(|c: &f64| c.is_finite())
            .ok_or_else(|| {
                config_error(
                    origin,
                    format!("line {line}: coefficient '{raw}' for '{name}' is not a finite number"),
                )
            })?;
        if coefficients.insert(name.to_string(), coef).is_some() {
            return Err(config_error(origin, format!("line {line}: duplicate covariate '{name}'")));
        }
    }
    log::debug!("read {} coefficient(s) from {origin}", coefficients.len());
    Ok(coefficients)
}

pub fn load_coefficients(path: &Path) -> Result<BTreeMap<String, f64>, PredictError> {
    let origin = path.display().to_string();
    let file = File::open(path).map_err(|e| config_error(&origin, e.to_string()))?;
    read_coefficients(file, &origin)
}

/// Combine a spec with fitted coefficients into a checked artifact.
pub fn build_artifact(
    spec: ArtifactSpec,
    coefficients: BTreeMap<String, f64>,
    origin: &str,
) -> Result<ModelArtifact, PredictError> {
    let names: Vec<&str> = spec.features.iter().map(|f| f.name.as_str()).collect();
    if let Some(extra) = coefficients.keys().find(|k| !names.contains(&k.as_str())) {
        return Err(config_error(
            origin,
            format!("coefficient '{extra}' has no matching feature"),
        ));
    }

    let offset = match (spec.offset, spec.baseline_means.is_empty()) {
        (Some(_), false) => {
            return Err(config_error(
                origin,
                "set either 'offset' or 'baseline_means', not both",
            ))
        }
        (Some(offset), true) => offset,
        (None, true) => 0.0,
        (None, false) => baseline_offset(&spec, &coefficients, origin)?,
    };

    let artifact = ModelArtifact {
        format: ARTIFACT_FORMAT.to_string(),
        format_version: ARTIFACT_FORMAT_VERSION,
        metadata: spec.metadata,
        features: spec.features,
        coefficients,
        offset,
        risk_cutpoints: spec.risk_cutpoints,
        missing_tokens: spec.missing_tokens.unwrap_or_else(default_missing_tokens),
        id_column: spec.id_column,
    };
    artifact
        .validate()
        .map_err(|reason| config_error(origin, reason))?;
    log::info!(
        "built artifact with {} feature(s), offset {}",
        artifact.features.len(),
        artifact.offset
    );
    Ok(artifact)
}

fn baseline_offset(
    spec: &ArtifactSpec,
    coefficients: &BTreeMap<String, f64>,
    origin: &str,
) -> Result<f64, PredictError> {
    if let Some(unknown) = spec
        .baseline_means
        .keys()
        .find(|k| spec.features.iter().all(|f| &f.name != *k))
    {
        return Err(config_error(
            origin,
            format!("baseline mean for unknown feature '{unknown}'"),
        ));
    }
    let mut sum = 0.0;
    for feature in &spec.features {
        let mean = spec.baseline_means.get(&feature.name).ok_or_else(|| {
            config_error(origin, format!("no baseline mean for feature '{}'", feature.name))
        })?;
        let beta = coefficients.get(&feature.name).ok_or_else(|| {
            config_error(origin, format!("no coefficient for feature '{}'", feature.name))
        })?;
        sum += beta * mean;
    }
    Ok(-sum)
}

/// Human-readable summary of an artifact for `ecrisk-artifact inspect`.
pub fn describe(artifact: &ModelArtifact) -> String {
    let mut out = String::new();
    let meta = &artifact.metadata;
    let _ = writeln!(
        out,
        "{} {} ({} v{})",
        if meta.name.is_empty() {
            "<unnamed>"
        } else {
            meta.name.as_str()
        },
        meta.version,
        artifact.format,
        artifact.format_version
    );
    if let Some(desc) = &meta.description {
        let _ = writeln!(out, "  {desc}");
    }
    if let Some(source) = &meta.source {
        let _ = writeln!(out, "  source: {source}");
    }
    let _ = writeln!(out, "features:");
    for feature in &artifact.features {
        let coef = artifact
            .coefficients
            .get(&feature.name)
            .copied()
            .unwrap_or(f64::NAN);
        let _ = writeln!(
            out,
            "  {:<20} {:<12} coef {:>12}  {}",
            feature.name,
            feature.encoding.kind_name(),
            coef,
            encoding_summary(&feature.encoding)
        );
    }
    let _ = writeln!(out, "offset: {}", artifact.offset);
    let [c1, c2] = artifact.risk_cutpoints;
    let _ = writeln!(out, "risk cut-points: Low < {c1} <= Medium < {c2} <= High");
    if let Some(id) = &artifact.id_column {
        let _ = writeln!(out, "id column: {id}");
    }
    let _ = writeln!(out, "missing tokens: {:?}", artifact.missing_tokens);
    out
}

fn encoding_summary(encoding: &FeatureEncoding) -> String {
    let mut parts = Vec::new();
    match encoding {
        FeatureEncoding::Numeric {
            impute,
            scale,
            invalid_code,
        } => {
            if let Some(v) = impute {
                parts.push(format!("impute={v}"));
            }
            if let Some(s) = scale {
                parts.push(format!("scale=({}, {})", s.mean, s.std));
            }
            if let Some(c) = invalid_code {
                parts.push(format!("invalid={c}"));
            }
        }
        FeatureEncoding::Categorical {
            levels,
            impute,
            unknown_code,
        } => {
            let levels: Vec<String> = levels.iter().map(|(k, v)| format!("{k}={v}")).collect();
            parts.push(format!("levels[{}]", levels.join(", ")));
            if let Some(v) = impute {
                parts.push(format!("impute={v}"));
            }
            if let Some(c) = unknown_code {
                parts.push(format!("unknown={c}"));
            }
        }
    }
    parts.join(" ")
}
