//! Chat-completion based analyzer.
//!
//! Sends one prompt per analysis to an OpenAI-compatible
//! `/v1/chat/completions` endpoint with a JSON response format and turns
//! the reply into an [`AnalysisResult`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use llm_analyzer::{AnalysisInput, Analyzer, LlmAnalyzer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let analyzer = LlmAnalyzer::from_env()?;
//!     let input = AnalysisInput {
//!         findings: Some("TSH 6.2 mIU/L".to_string()),
//!         ..Default::default()
//!     };
//!     let result = analyzer.analyze(&input, &|percent| println!("{percent}%")).await;
//!     println!("{}", result.summary);
//!     Ok(())
//! }
//! ```

mod analyzer;
mod api_types;
mod config;

pub use analyzer::LlmAnalyzer;
pub use config::{LlmAnalyzerConfig, LlmAnalyzerConfigBuilder};

// Re-export analysis-core types for convenience
pub use analysis_core::{
    async_trait, AnalysisError, AnalysisInput, AnalysisResult, Analyzer, PatientInfo, ProgressFn,
};
