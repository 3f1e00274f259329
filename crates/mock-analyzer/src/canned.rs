//! Canned analyzer - fixed output, fixed progress cadence.

use std::time::Duration;

use analysis_core::{
    async_trait, AnalysisInput, AnalysisResult, Analyzer, ProgressFn, ProgressReporter,
};
use tokio::time::sleep;
use tracing::debug;

/// Progress values reported by [`MockAnalyzer`], in order.
pub const MOCK_CHECKPOINTS: [u8; 6] = [10, 25, 45, 70, 90, 100];

/// An analyzer that returns the same result shape for every input.
///
/// The summary names the patient when one is given. Between checkpoints it
/// waits `step_delay` so UIs can exercise their progress display.
#[derive(Debug, Clone)]
pub struct MockAnalyzer {
    step_delay: Duration,
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

impl MockAnalyzer {
    /// Create a MockAnalyzer waiting `step_delay` between checkpoints.
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }

    /// Create a MockAnalyzer without delays.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    fn canned_result(input: &AnalysisInput) -> AnalysisResult {
        let patient = input.patient_name().unwrap_or("the patient");

        let mut key_findings = vec![
            format!("Thyroid markers for {} suggest reduced conversion of T4 to T3", patient),
            "Inflammatory markers slightly above the functional range".to_string(),
            "Vitamin D below the optimal range".to_string(),
        ];
        if let Some(findings) = input.findings.as_deref().map(str::trim) {
            if !findings.is_empty() {
                key_findings[0] = format!("{} (reported: {})", key_findings[0], findings);
            }
        }

        AnalysisResult {
            summary: format!(
                "Simulated analysis for {}: the exams point to a mild thyroid imbalance with low-grade inflammation.",
                patient
            ),
            key_findings,
            recommendations: vec![
                "Increase intake of selenium and zinc rich foods".to_string(),
                "Consider vitamin D supplementation after retesting".to_string(),
                "Repeat the thyroid panel in 8 weeks".to_string(),
            ],
            risk_factors: Some(vec!["Family history of thyroid disease".to_string()]),
        }
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(&self, input: &AnalysisInput, on_progress: &ProgressFn) -> AnalysisResult {
        let progress = ProgressReporter::new(on_progress);
        debug!(
            files = input.file_names.len(),
            "Running simulated analysis"
        );

        for checkpoint in MOCK_CHECKPOINTS {
            if !self.step_delay.is_zero() {
                sleep(self.step_delay).await;
            }
            progress.report(checkpoint);
        }

        Self::canned_result(input)
    }

    fn name(&self) -> &str {
        "MockAnalyzer"
    }

    fn is_mock(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::PatientInfo;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_mock_mentions_patient_with_three_findings() {
        let analyzer = MockAnalyzer::instant();
        let input = AnalysisInput {
            findings: Some("TSH elevated".to_string()),
            patient_info: Some(PatientInfo::named("Ana")),
            ..Default::default()
        };

        let seen: &'static Mutex<Vec<u8>> = Box::leak(Box::new(Mutex::new(Vec::new())));
        let sink = |p: u8| seen.lock().unwrap().push(p);
        let result = analyzer.analyze(&input, &sink).await;

        assert!(result.summary.contains("Ana"));
        assert_eq!(result.key_findings.len(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![10, 25, 45, 70, 90, 100]);
    }

    #[tokio::test]
    async fn test_mock_without_patient() {
        let result = MockAnalyzer::instant()
            .analyze(&AnalysisInput::default(), &|_| {})
            .await;

        assert!(result.summary.contains("the patient"));
        assert_eq!(result.key_findings.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_waits_between_checkpoints() {
        let analyzer = MockAnalyzer::new(Duration::from_millis(100));
        let start = tokio::time::Instant::now();

        analyzer.analyze(&AnalysisInput::default(), &|_| {}).await;

        assert!(start.elapsed() >= Duration::from_millis(600));
    }

    #[test]
    fn test_analyzer_name() {
        let analyzer = MockAnalyzer::default();
        assert_eq!(analyzer.name(), "MockAnalyzer");
        assert!(analyzer.is_mock());
    }
}
