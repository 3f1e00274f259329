//! Slow analyzer for exercising work that overlaps a running stage.

use std::time::Duration;

use analysis_core::{
    async_trait, AnalysisError, AnalysisInput, AnalysisResult, Analyzer, ProgressFn,
};
use tokio::time::sleep;

/// Waits before handing the call to `inner`, the way a hosted model keeps a
/// stage open while requests against the same plan keep arriving.
pub struct DelayedAnalyzer<A: Analyzer> {
    inner: A,
    delay: Duration,
}

impl<A: Analyzer> DelayedAnalyzer<A> {
    /// Create a new DelayedAnalyzer wrapping the given analyzer with the specified delay.
    pub fn new(inner: A, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Create an analyzer with a delay in milliseconds.
    pub fn with_millis(inner: A, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }
}

#[async_trait]
impl<A: Analyzer> Analyzer for DelayedAnalyzer<A> {
    async fn analyze(&self, input: &AnalysisInput, on_progress: &ProgressFn) -> AnalysisResult {
        sleep(self.delay).await;
        self.inner.analyze(input, on_progress).await
    }

    async fn try_analyze(
        &self,
        input: &AnalysisInput,
        on_progress: &ProgressFn,
    ) -> Result<AnalysisResult, AnalysisError> {
        sleep(self.delay).await;
        self.inner.try_analyze(input, on_progress).await
    }

    fn name(&self) -> &str {
        "DelayedAnalyzer"
    }

    fn is_mock(&self) -> bool {
        self.inner.is_mock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockAnalyzer;
    use std::time::Instant;

    #[tokio::test]
    async fn test_delayed_analyzer() {
        let analyzer = DelayedAnalyzer::with_millis(MockAnalyzer::instant(), 100);

        let start = Instant::now();
        let result = analyzer.analyze(&AnalysisInput::default(), &|_| {}).await;
        let elapsed = start.elapsed();

        assert_eq!(result.key_findings.len(), 3);
        assert!(elapsed >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_starts_after_delay() {
        let analyzer = DelayedAnalyzer::with_millis(MockAnalyzer::instant(), 500);
        let seen: &'static std::sync::Mutex<Vec<u8>> = Box::leak(Box::new(std::sync::Mutex::new(Vec::new())));
        let record = |p: u8| seen.lock().unwrap().push(p);

        let start = tokio::time::Instant::now();
        let result = analyzer.try_analyze(&AnalysisInput::default(), &record).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(result.key_findings.len(), 3);
        assert_eq!(seen.lock().unwrap().last(), Some(&100));
    }

    #[tokio::test]
    async fn test_analyzer_name() {
        let analyzer = DelayedAnalyzer::with_millis(MockAnalyzer::instant(), 0);
        assert_eq!(analyzer.name(), "DelayedAnalyzer");
        assert!(analyzer.is_mock());
    }
}
