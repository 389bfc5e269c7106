use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{domain::DatasetKind, error::PayloadError};

/// Multipart field name the analysis endpoints read the upload from.
pub const UPLOAD_FIELD: &str = "file";
pub const BREAST_ANALYZE_PATH: &str = "analyze";
pub const LUNG_ANALYZE_PATH: &str = "lung/analyze";
pub const FAIRNESS_PATH: &str = "fairness";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairnessMetric {
    pub accuracy: f64,
    pub count: u64,
}

/// HER2-status analysis as returned by the default endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreastAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DatasetKind>,
    pub risk_score: f64,
    pub risk_label: String,
    pub fairness_metrics: BTreeMap<String, FairnessMetric>,
    pub disparity_index: f64,
    #[serde(default)]
    pub demographic_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub is_biased: bool,
    pub insights: String,
}

/// Lung cancer subtype analysis as returned by the lung endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LungAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DatasetKind>,
    pub subtype_distribution: BTreeMap<String, f64>,
    pub disparity_index: f64,
    #[serde(default)]
    pub fairness_metrics: BTreeMap<String, FairnessMetric>,
    #[serde(default)]
    pub demographic_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub is_biased: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_accuracy: Option<f64>,
    pub insights: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Breast(BreastAnalysis),
    Lung(LungAnalysis),
}

impl AnalysisResult {
    pub fn kind(&self) -> DatasetKind {
        match self {
            AnalysisResult::Breast(_) => DatasetKind::Breast,
            AnalysisResult::Lung(_) => DatasetKind::Lung,
        }
    }

    pub fn insights(&self) -> &str {
        match self {
            AnalysisResult::Breast(result) => &result.insights,
            AnalysisResult::Lung(result) => &result.insights,
        }
    }

    pub fn disparity_index(&self) -> f64 {
        match self {
            AnalysisResult::Breast(result) => result.disparity_index,
            AnalysisResult::Lung(result) => result.disparity_index,
        }
    }
}

/// Static model-wide fairness snapshot served at `/fairness`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessBaseline {
    pub overall_accuracy: f64,
    pub fairness_metrics: BTreeMap<String, FairnessMetric>,
    pub disparity_index: f64,
}

/// Decodes a successful analysis response.
///
/// A `kind` field in the body wins over `routed`, which is the kind the
/// request was dispatched under. The decoded payload is range-checked so a
/// dashboard never has to cope with NaNs or negative disparities.
pub fn decode_analysis(body: Value, routed: DatasetKind) -> Result<AnalysisResult, PayloadError> {
    let kind = match body.get("kind").and_then(Value::as_str) {
        Some("lung") => DatasetKind::Lung,
        Some("breast") => DatasetKind::Breast,
        _ => routed,
    };

    match kind {
        DatasetKind::Breast => {
            let result: BreastAnalysis = decode_as(body, "breast")?;
            validate_breast(&result)?;
            Ok(AnalysisResult::Breast(result))
        }
        DatasetKind::Lung => {
            let result: LungAnalysis = decode_as(body, "lung")?;
            validate_lung(&result)?;
            Ok(AnalysisResult::Lung(result))
        }
    }
}

fn decode_as<T: DeserializeOwned>(body: Value, kind: &'static str) -> Result<T, PayloadError> {
    serde_json::from_value(body).map_err(|source| PayloadError::Decode { kind, source })
}

fn validate_breast(result: &BreastAnalysis) -> Result<(), PayloadError> {
    check_unit_interval("risk_score", result.risk_score)?;
    check_non_negative("disparity_index", result.disparity_index)?;
    check_fairness_metrics(&result.fairness_metrics)
}

fn validate_lung(result: &LungAnalysis) -> Result<(), PayloadError> {
    check_non_negative("disparity_index", result.disparity_index)?;
    for (subtype, share) in &result.subtype_distribution {
        check_non_negative(&format!("subtype_distribution.{subtype}"), *share)?;
    }
    if let Some(accuracy) = result.overall_accuracy {
        check_unit_interval("overall_accuracy", accuracy)?;
    }
    check_fairness_metrics(&result.fairness_metrics)
}

fn check_fairness_metrics(metrics: &BTreeMap<String, FairnessMetric>) -> Result<(), PayloadError> {
    for (group, metric) in metrics {
        check_unit_interval(&format!("fairness_metrics.{group}.accuracy"), metric.accuracy)?;
    }
    Ok(())
}

fn check_finite(field: &str, value: f64) -> Result<(), PayloadError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PayloadError::NonFinite {
            field: field.to_string(),
        })
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<(), PayloadError> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(PayloadError::OutOfRange {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), PayloadError> {
    check_non_negative(field, value)?;
    if value > 1.0 {
        return Err(PayloadError::OutOfRange {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
