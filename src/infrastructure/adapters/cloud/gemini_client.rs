//! Gemini Client - 调用云端 generateContent 接口
//!
//! 实现 InferenceExecutorPort，API key 放在 query string 中
//!
//! 外部 API:
//! POST {endpoint}/models/{model}:generateContent?key=...
//! Request: {"contents": [{"role": "user", "parts": [{"text": ...}, {"inline_data": {...}}]}],
//!           "generationConfig": {...}}
//! Response: {"candidates": [{"content": {"parts": [{"text": ...}]}, "finishReason": ...}]}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::response::{error_message, parse_generate_response};
use crate::application::error::InferenceError;
use crate::application::ports::{CredentialStorePort, InferenceExecutorPort};
use crate::application::result::{interpret_model_text, ExecutorRoute};
use crate::domain::{InferenceTask, Prompt, TaskOutput};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'static str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

/// Gemini 客户端配置
#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    /// API 基础 URL
    pub endpoint: String,
    /// 模型名
    pub model: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout_secs: 60,
            max_output_tokens: 1024,
            temperature: 0.4,
        }
    }
}

impl GeminiClientConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// 云端执行器
pub struct GeminiExecutor {
    client: Client,
    config: GeminiClientConfig,
    credentials: Arc<dyn CredentialStorePort>,
}

impl GeminiExecutor {
    pub fn new(
        config: GeminiClientConfig,
        credentials: Arc<dyn CredentialStorePort>,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InferenceError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    /// generateContent URL（不含 key）
    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request<'a>(&self, prompt: &'a Prompt) -> GenerateContentRequest<'a> {
        let mut parts = vec![RequestPart::Text { text: &prompt.text }];
        if let Some(image) = &prompt.image {
            parts.push(RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.media_type().as_str(),
                    data: image.base64_data(),
                },
            });
        }

        GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_output_tokens,
                temperature: self.config.temperature,
            },
        }
    }
}

#[async_trait]
impl InferenceExecutorPort for GeminiExecutor {
    fn route(&self) -> ExecutorRoute {
        ExecutorRoute::Cloud
    }

    async fn execute(
        &self,
        task: &InferenceTask,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, InferenceError> {
        let api_key = self
            .credentials
            .get_credential()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(InferenceError::missing_credential)?;

        let prompt = Prompt::for_task(task);
        let request = self.build_request(&prompt);
        let url = self.generate_url();

        tracing::debug!(
            url = %url,
            task_kind = %task.kind(),
            multimodal = prompt.is_multimodal(),
            "Sending generateContent request"
        );

        let send = self
            .client
            .post(&url)
            .query(&[("key", api_key.as_str())])
            .json(&request)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(InferenceError::Cancelled),
            response = send => response.map_err(InferenceError::from_reqwest)?,
        };

        let status = response.status();
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(InferenceError::Cancelled),
            body = response.text() => body.map_err(InferenceError::from_reqwest)?,
        };

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "generateContent request failed");
            return Err(InferenceError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_message(&body)
            )));
        }

        let generated = parse_generate_response(&body)?;
        if generated.truncated {
            tracing::warn!(task_kind = %task.kind(), "Cloud response truncated at token limit");
        }

        interpret_model_text(task, &generated.text, generated.truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::ErrorKind;
    use crate::application::orchestrator::{HybridOrchestrator, OrchestratorOptions};
    use crate::application::result::ExecutorResult;
    use crate::application::testing::{sample_image, RecordingSink};
    use crate::domain::moderation::CommentText;
    use crate::infrastructure::adapters::test_server::{serve, serve_silent};
    use crate::infrastructure::memory::InMemoryCredentialStore;
    use tokio::net::TcpListener;

    fn executor(endpoint: &str, key: Option<&str>) -> GeminiExecutor {
        let store = InMemoryCredentialStore::new(key.map(str::to_string));
        GeminiExecutor::new(
            GeminiClientConfig::default().with_endpoint(endpoint),
            Arc::new(store),
        )
        .unwrap()
    }

    #[test]
    fn test_request_shape() {
        let exec = executor("http://unused", Some("k"));
        let prompt = Prompt::for_task(&InferenceTask::describe_image(sample_image(1)));
        let value = serde_json::to_value(exec.build_request(&prompt)).unwrap();

        let parts = &value["contents"][0]["parts"];
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(parts[0]["text"], prompt.text.as_str());
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(
            parts[1]["inline_data"]["data"],
            sample_image(1).base64_data()
        );
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_text_only_request_has_single_part() {
        let exec = executor("http://unused", Some("k"));
        let task = InferenceTask::moderate_comment(CommentText::new("Nice!").unwrap(), None);
        let prompt = Prompt::for_task(&task);
        let value = serde_json::to_value(exec.build_request(&prompt)).unwrap();

        assert_eq!(value["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_generate_url() {
        let exec = executor("https://example.test/v1beta/", Some("k"));
        assert_eq!(
            exec.generate_url(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let task = InferenceTask::describe_image(sample_image(1));

        for key in [None, Some("   ")] {
            let err = executor(&endpoint, key)
                .execute(&task, &CancellationToken::new())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }

        let accepted =
            tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
        assert!(accepted.is_err(), "no connection should have been made");
    }

    #[tokio::test]
    async fn test_no_credential_through_orchestrator() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let orch = HybridOrchestrator::new(
            Arc::new(executor(&endpoint, None)),
            None,
            Arc::new(RecordingSink::default()),
            OrchestratorOptions::default(),
        );

        let result = orch.run(InferenceTask::describe_image(sample_image(1))).await;

        match result {
            ExecutorResult::Failure { kind, .. } => assert_eq!(kind, ErrorKind::Configuration),
            other => panic!("unexpected result: {:?}", other),
        }
        let accepted =
            tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
        assert!(accepted.is_err());
    }

    #[tokio::test]
    async fn test_successful_description() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "A red bicycle leaning against a brick wall."}]}, "finishReason": "STOP"}]}"#;
        let (endpoint, server) = serve(vec![(200, body.to_string())]).await;
        let task = InferenceTask::describe_image(sample_image(1));

        let output = executor(&endpoint, Some("secret-key"))
            .execute(&task, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            output.description_text(),
            Some("A red bicycle leaning against a brick wall.")
        );
        let requests = server.await.unwrap();
        assert!(requests[0]
            .request_line()
            .starts_with("POST /models/gemini-2.0-flash:generateContent?key=secret-key"));
        assert_eq!(
            requests[0].json()["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/jpeg"
        );
    }

    #[tokio::test]
    async fn test_moderation_verdict_from_cloud() {
        let text = "Here is my analysis:\n{\"isProblematic\": true, \"reason\": \"discouraging without explanation\", \"suggestion\": \"Could you say more?\"}";
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        })
        .to_string();
        let (endpoint, _server) = serve(vec![(200, body)]).await;
        let task = InferenceTask::moderate_comment(CommentText::new("Hate it!").unwrap(), None);

        let output = executor(&endpoint, Some("k"))
            .execute(&task, &CancellationToken::new())
            .await
            .unwrap();

        match output {
            TaskOutput::Verdict(verdict) => {
                assert!(verdict.is_problematic);
                assert_eq!(verdict.reason.as_deref(), Some("discouraging without explanation"));
            }
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_is_transport_with_message() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid."}}"#;
        let (endpoint, _server) = serve(vec![(403, body.to_string())]).await;
        let task = InferenceTask::describe_image(sample_image(1));

        let err = executor(&endpoint, Some("bad"))
            .execute(&task, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.to_string(), "Transport error: HTTP 403: API key not valid.");
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let (endpoint, _server) = serve_silent().await;
        let exec = executor(&endpoint, Some("k"));
        let task = InferenceTask::describe_image(sample_image(1));
        let token = CancellationToken::new();

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                token.cancel();
            })
        };

        let err = exec.execute(&task, &token).await.unwrap_err();
        canceller.await.unwrap();
        assert_eq!(err, InferenceError::Cancelled);
    }
}
