//! Error types for analysis operations.

use thiserror::Error;

/// Errors that can occur while producing an analysis.
///
/// Analyzers never surface these from [`Analyzer::analyze`](crate::Analyzer::analyze);
/// they are logged and turned into a fallback result.
/// [`Analyzer::try_analyze`](crate::Analyzer::try_analyze) hands them to callers
/// that must not store a fallback.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The provider could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered with an error status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider answered without any content.
    #[error("empty reply from model")]
    EmptyReply,

    /// The reply was not the expected JSON object.
    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// The analyzer is missing credentials or settings.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AnalysisError {
    /// Short, stable name of the failure class.
    pub fn class(&self) -> &'static str {
        match self {
            AnalysisError::Network(_) => "NetworkError",
            AnalysisError::Api { .. } => "ApiError",
            AnalysisError::EmptyReply => "EmptyReply",
            AnalysisError::MalformedReply(_) => "MalformedReply",
            AnalysisError::Configuration(_) => "ConfigurationError",
        }
    }
}
