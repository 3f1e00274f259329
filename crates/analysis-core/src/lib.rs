//! Core trait and types for clinical analysis implementations.
//!
//! This crate provides the shared interface used by every analyzer in the
//! plan pipeline. It defines:
//!
//! - [`Analyzer`] - The trait that all analyzers implement
//! - [`AnalysisInput`] / [`AnalysisResult`] - Input and output of one analysis
//! - [`AnalysisError`] - Failures an analyzer can hit before it falls back
//! - [`ProgressReporter`] - Monotonic progress callbacks
//!
//! # Example
//!
//! ```rust
//! use analysis_core::{async_trait, AnalysisInput, AnalysisResult, Analyzer, ProgressFn};
//!
//! struct FixedAnalyzer;
//!
//! #[async_trait]
//! impl Analyzer for FixedAnalyzer {
//!     async fn analyze(&self, _input: &AnalysisInput, on_progress: &ProgressFn) -> AnalysisResult {
//!         on_progress(100);
//!         AnalysisResult::new("All markers within range")
//!     }
//!
//!     fn name(&self) -> &str {
//!         "FixedAnalyzer"
//!     }
//! }
//! ```

mod error;
mod progress;
mod prompt;
mod reply;
mod trait_def;
mod types;

pub use error::AnalysisError;
pub use progress::{ProgressFn, ProgressReporter};
pub use prompt::{build_prompt, hash_input, hash_prompt, SYSTEM_PROMPT};
pub use reply::{parse_reply, OneOrMany, RawAnalysisReply};
pub use trait_def::Analyzer;
pub use types::{AnalysisInput, AnalysisResult, PatientInfo};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
