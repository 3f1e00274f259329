//! Deterministic analyzers for environments without a model credential.
//!
//! This crate provides mock implementations of the `Analyzer` trait:
//! - `MockAnalyzer` - Canned result that mentions the patient
//! - `DelayedAnalyzer` - Wraps another analyzer with artificial delay
//!
//! For hosted analysis, use the `llm-analyzer` crate instead.
//!
//! # Example
//!
//! ```rust
//! use mock_analyzer::{AnalysisInput, Analyzer, MockAnalyzer, PatientInfo};
//!
//! #[tokio::main]
//! async fn main() {
//!     let analyzer = MockAnalyzer::instant();
//!     let input = AnalysisInput {
//!         patient_info: Some(PatientInfo::named("Ana")),
//!         ..Default::default()
//!     };
//!
//!     let result = analyzer.analyze(&input, &|_| {}).await;
//!     assert!(result.summary.contains("Ana"));
//! }
//! ```

mod canned;
mod delayed;

// Re-export analysis-core types for convenience
pub use analysis_core::{
    async_trait, AnalysisInput, AnalysisResult, Analyzer, PatientInfo, ProgressFn,
};

pub use canned::{MockAnalyzer, MOCK_CHECKPOINTS};
pub use delayed::DelayedAnalyzer;
