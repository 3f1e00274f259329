//! Input and output types for one analysis.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Patient identity passed to the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientInfo {
    pub full_name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub main_complaint: Option<String>,
}

impl PatientInfo {
    /// Create patient info with just a name.
    pub fn named(full_name: impl Into<String>) -> Self {
        Self {
            full_name: Some(full_name.into()),
            ..Default::default()
        }
    }
}

/// Everything an analyzer gets to look at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisInput {
    /// Findings from earlier stages or free text from the clinician.
    pub findings: Option<String>,
    /// Recommendations from earlier stages.
    pub recommendations: Option<String>,
    /// Names of attached exam files.
    pub file_names: Vec<String>,
    pub patient_info: Option<PatientInfo>,
}

impl AnalysisInput {
    /// Name of the patient, if one was given and is not blank.
    pub fn patient_name(&self) -> Option<&str> {
        self.patient_info
            .as_ref()
            .and_then(|p| p.full_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Structured result of an analysis.
///
/// List fields are always lists; scalar replies are normalized before a
/// result is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_factors: Option<Vec<String>>,
}

impl AnalysisResult {
    /// Create a result with only a summary.
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Default::default()
        }
    }

    /// The fixed result returned when an analysis fails.
    pub fn fallback(error: &AnalysisError) -> Self {
        Self {
            summary: "The automatic analysis could not be completed. Review the exams manually."
                .to_string(),
            key_findings: vec![format!("Analysis unavailable ({})", error.class())],
            recommendations: vec![
                "Repeat the analysis later or consult the exam reports directly.".to_string(),
            ],
            risk_factors: None,
        }
    }
}
