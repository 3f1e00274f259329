//! The Analyzer trait definition.

use async_trait::async_trait;

use crate::error::AnalysisError;
use crate::progress::ProgressFn;
use crate::types::{AnalysisInput, AnalysisResult};

/// A component that turns prior findings into a structured analysis.
///
/// `analyze` is total: provider failures are logged by the implementation
/// and replaced with [`AnalysisResult::fallback`]. The progress callback
/// receives non-decreasing percentages and, on success, ends at 100.
///
/// This trait is object-safe and can be used with `Arc<dyn Analyzer>`.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze the input, reporting progress along the way.
    async fn analyze(&self, input: &AnalysisInput, on_progress: &ProgressFn) -> AnalysisResult;

    /// Analyze the input, returning provider failures instead of the fallback.
    ///
    /// Callers that store results use this to avoid persisting a fallback.
    /// Default implementation delegates to `analyze` and never fails.
    async fn try_analyze(
        &self,
        input: &AnalysisInput,
        on_progress: &ProgressFn,
    ) -> Result<AnalysisResult, AnalysisError> {
        Ok(self.analyze(input, on_progress).await)
    }

    /// Get a human-readable name for this analyzer.
    fn name(&self) -> &str;

    /// Whether results are canned rather than produced by a model.
    ///
    /// Default implementation returns false.
    fn is_mock(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl Analyzer for Fixed {
        async fn analyze(&self, _input: &AnalysisInput, on_progress: &ProgressFn) -> AnalysisResult {
            on_progress(100);
            AnalysisResult::new("Stable")
        }

        fn name(&self) -> &str {
            "Fixed"
        }
    }

    #[tokio::test]
    async fn test_try_analyze_defaults_to_analyze() {
        let result = Fixed.try_analyze(&AnalysisInput::default(), &|_| {}).await.unwrap();
        assert_eq!(result.summary, "Stable");
        assert!(!Fixed.is_mock());
    }
}
