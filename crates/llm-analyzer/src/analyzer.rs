//! LlmAnalyzer implementation over a chat-completion API.

use analysis_core::{
    async_trait, build_prompt, hash_prompt, parse_reply, AnalysisError, AnalysisInput,
    AnalysisResult, Analyzer, ProgressFn, ProgressReporter,
};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::api_types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseFormat,
};
use crate::config::LlmAnalyzerConfig;

/// An analyzer backed by a hosted language model.
///
/// Progress is reported at fixed checkpoints: 10 on start, 30 once the
/// prompt is built, 50 when the reply arrives, 80 once it is parsed and 100
/// at the end. Failures still end at 100.
pub struct LlmAnalyzer {
    client: Client,
    config: LlmAnalyzerConfig,
}

impl LlmAnalyzer {
    /// Create a new LlmAnalyzer with the given configuration.
    pub fn new(config: LlmAnalyzerConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder().build().map_err(|e| {
            AnalysisError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        info!("LlmAnalyzer initialized with model: {}", config.model);

        Ok(Self { client, config })
    }

    /// Create an LlmAnalyzer from environment variables.
    ///
    /// See [`LlmAnalyzerConfig::from_env`] for required environment variables.
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::new(LlmAnalyzerConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &LlmAnalyzerConfig {
        &self.config
    }

    async fn run(
        &self,
        input: &AnalysisInput,
        progress: &ProgressReporter<'_>,
    ) -> Result<AnalysisResult, AnalysisError> {
        progress.report(10);
        let prompt = build_prompt(input);
        debug!("Analysis prompt fingerprint: {}", hash_prompt(&prompt));
        progress.report(30);

        let completion = self.chat_completion(vec![ChatMessage::user(prompt)]).await?;
        progress.report(50);

        if let Some(usage) = &completion.usage {
            debug!(
                "Token usage - prompt: {}, completion: {}, total: {}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AnalysisError::EmptyReply)?;

        let result = parse_reply(&content)?;
        progress.report(80);

        Ok(result)
    }

    /// Make a chat completion request.
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<ChatCompletionResponse, AnalysisError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: ResponseFormat::json_object(),
        };

        debug!("Sending analysis request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            // Try to parse as API error
            let message = match serde_json::from_str::<ApiError>(&error_text) {
                Ok(api_error) => api_error.error.message,
                Err(_) => error_text,
            };

            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedReply(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    async fn analyze(&self, input: &AnalysisInput, on_progress: &ProgressFn) -> AnalysisResult {
        match self.try_analyze(input, on_progress).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error_class = e.class(), "Analysis failed, using fallback: {}", e);
                AnalysisResult::fallback(&e)
            }
        }
    }

    async fn try_analyze(
        &self,
        input: &AnalysisInput,
        on_progress: &ProgressFn,
    ) -> Result<AnalysisResult, AnalysisError> {
        let progress = ProgressReporter::new(on_progress);
        let result = self.run(input, &progress).await;
        progress.finish();
        result
    }

    fn name(&self) -> &str {
        "LlmAnalyzer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::PatientInfo;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn analyzer_for(server: &MockServer) -> LlmAnalyzer {
        let config = LlmAnalyzerConfig::builder()
            .api_key("test-key")
            .api_url(server.uri())
            .build();
        LlmAnalyzer::new(config).unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
        })
    }

    fn input() -> AnalysisInput {
        AnalysisInput {
            findings: Some("TSH elevated".to_string()),
            patient_info: Some(PatientInfo::named("Ana")),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_successful_analysis_reports_checkpoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"summary": "Subclinical hypothyroidism", "keyFindings": "TSH elevated", "recommendations": ["Retest in 6 weeks"], "riskFactors": []}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let seen: &'static Mutex<Vec<u8>> = Box::leak(Box::new(Mutex::new(Vec::new())));
        let sink = |p: u8| seen.lock().unwrap().push(p);
        let result = analyzer_for(&server).analyze(&input(), &sink).await;

        assert_eq!(result.summary, "Subclinical hypothyroidism");
        assert_eq!(result.key_findings, vec!["TSH elevated".to_string()]);
        assert_eq!(result.risk_factors, Some(Vec::new()));
        assert_eq!(*seen.lock().unwrap(), vec![10, 30, 50, 80, 100]);
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("I cannot help")))
            .mount(&server)
            .await;

        let analyzer = analyzer_for(&server);
        let seen: &'static Mutex<Vec<u8>> = Box::leak(Box::new(Mutex::new(Vec::new())));
        let sink = |p: u8| seen.lock().unwrap().push(p);
        let result = analyzer.analyze(&input(), &sink).await;

        assert_eq!(result, AnalysisResult::fallback(&AnalysisError::MalformedReply(String::new())));
        assert!(result.key_findings[0].contains("MalformedReply"));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_api_error_is_exposed_by_try_analyze() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let err = analyzer_for(&server)
            .try_analyze(&input(), &|_| {})
            .await
            .unwrap_err();

        match err {
            AnalysisError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("Incorrect API key"));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back() {
        let config = LlmAnalyzerConfig::builder()
            .api_key("test-key")
            .api_url("http://127.0.0.1:9")
            .build();
        let analyzer = LlmAnalyzer::new(config).unwrap();

        let result = analyzer.analyze(&input(), &|_| {}).await;
        assert!(result.key_findings[0].contains("NetworkError"));
    }

    #[test]
    fn test_analyzer_name() {
        let analyzer = LlmAnalyzer::new(LlmAnalyzerConfig::default()).unwrap();
        assert_eq!(analyzer.name(), "LlmAnalyzer");
        assert!(!analyzer.is_mock());
    }
}
