//! Risk groups from scores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskGroup {
    Low,
    Medium,
    High,
}

impl RiskGroup {
    pub const ALL: [RiskGroup; 3] = [RiskGroup::Low, RiskGroup::Medium, RiskGroup::High];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskGroup::Low => "Low",
            RiskGroup::Medium => "Medium",
            RiskGroup::High => "High",
        }
    }
}

impl fmt::Display for RiskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Low" => Ok(RiskGroup::Low),
            "Medium" => Ok(RiskGroup::Medium),
            "High" => Ok(RiskGroup::High),
            other => Err(format!("unknown risk group '{other}'")),
        }
    }
}

/// Band a score with half-open intervals: `[-inf, c1)` Low, `[c1, c2)` Medium,
/// `[c2, inf)` High. Scores equal to a cut-point fall in the higher band.
pub fn classify(score: f64, cutpoints: [f64; 2]) -> RiskGroup {
    debug_assert!(score.is_finite());
    let [c1, c2] = cutpoints;
    if score < c1 {
        RiskGroup::Low
    } else if score < c2 {
        RiskGroup::Medium
    } else {
        RiskGroup::High
    }
}

/// How a batch of scores is turned into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// Fixed cut-points stored in the artifact.
    #[default]
    Cutpoints,
    /// Tertiles of the batch being scored.
    Cohort,
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grouping::Cutpoints => f.write_str("cutpoints"),
            Grouping::Cohort => f.write_str("cohort"),
        }
    }
}

impl FromStr for Grouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cutpoints" => Ok(Grouping::Cutpoints),
            "cohort" => Ok(Grouping::Cohort),
            other => Err(format!(
                "unknown grouping '{other}' (expected 'cutpoints' or 'cohort')"
            )),
        }
    }
}

/// Group every score of a batch, preserving order.
pub fn assign_groups(scores: &[f64], grouping: Grouping, cutpoints: [f64; 2]) -> Vec<RiskGroup> {
    match grouping {
        Grouping::Cutpoints => scores.iter().map(|s| classify(*s, cutpoints)).collect(),
        Grouping::Cohort => cohort_groups(scores),
    }
}

/// Data-relative grouping.
///
/// Three or more distinct scores are split at the 1/3 and 2/3 quantiles
/// (right-closed bins). Two distinct scores give Low/High. A single distinct
/// score makes every patient Medium.
pub fn cohort_groups(scores: &[f64]) -> Vec<RiskGroup> {
    let mut sorted: Vec<f64> = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut distinct = sorted.clone();
    distinct.dedup();

    match distinct.len() {
        0 => Vec::new(),
        1 => vec![RiskGroup::Medium; scores.len()],
        2 => {
            let low = distinct[0];
            scores
                .iter()
                .map(|s| if *s <= low { RiskGroup::Low } else { RiskGroup::High })
                .collect()
        }
        _ => {
            let q1 = quantile(&sorted, 1.0 / 3.0);
            let q2 = quantile(&sorted, 2.0 / 3.0);
            log::debug!("cohort tertile edges: {q1} / {q2}");
            scores
                .iter()
                .map(|s| {
                    if *s <= q1 {
                        RiskGroup::Low
                    } else if *s <= q2 {
                        RiskGroup::Medium
                    } else {
                        RiskGroup::High
                    }
                })
                .collect()
        }
    }
}

/// Linear-interpolation quantile of sorted data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
