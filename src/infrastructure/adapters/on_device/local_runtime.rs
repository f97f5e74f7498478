//! Local Runtime Capability - 本机模型运行时（Ollama 兼容 API）
//!
//! 实现 OnDeviceCapabilityPort，通过 loopback HTTP 调用本机运行时
//!
//! 本机 API:
//! GET  /api/tags      已安装模型列表（用于探测）
//! POST /api/pull      拉取模型，NDJSON 流式进度
//! POST /api/generate  {"model", "prompt", "images": [base64], "stream": false, "options", "context"}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::application::error::InferenceError;
use crate::application::ports::{OnDeviceCapabilityPort, SessionHandle, SessionOptions};
use crate::domain::{AvailabilityStatus, Prompt};

/// 本机运行时配置
#[derive(Debug, Clone)]
pub struct LocalRuntimeConfig {
    /// 运行时基础 URL
    pub endpoint: String,
    /// 模型名（如 gemma3:4b）
    pub model: String,
    /// 探测超时
    pub probe_timeout: Duration,
    /// 单次生成请求的超时上限（编排器有更短的等待上限）
    pub request_timeout: Duration,
    /// 是否允许触发模型下载
    pub allow_download: bool,
}

impl Default for LocalRuntimeConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "gemma3:4b".to_string(),
            probe_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(120),
            allow_download: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct PullStatus {
    #[serde(default)]
    status: String,
    total: Option<u64>,
    completed: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<&'a str>,
    stream: bool,
    options: GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a [i64]>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    context: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
struct RuntimeError {
    error: String,
}

/// 下载进度
#[derive(Debug, Default)]
struct DownloadState {
    pulling: bool,
    progress: Option<f32>,
}

/// 本机运行时能力
pub struct LocalRuntimeCapability {
    client: Client,
    config: LocalRuntimeConfig,
    download: Arc<RwLock<DownloadState>>,
}

impl LocalRuntimeCapability {
    pub fn new(config: LocalRuntimeConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .connect_timeout(config.probe_timeout)
            .build()
            .map_err(|e| InferenceError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            download: Arc::new(RwLock::new(DownloadState::default())),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn has_model(&self, tags: &TagsResponse) -> bool {
        let wanted = self.config.model.as_str();
        tags.models.iter().any(|tag| {
            tag.name == wanted
                || (!wanted.contains(':') && tag.name.strip_suffix(":latest") == Some(wanted))
        })
    }

    async fn pull(&self) -> Result<(), InferenceError> {
        let response = self
            .client
            .post(self.url("/api/pull"))
            .json(&PullRequest {
                model: &self.config.model,
                stream: true,
            })
            .send()
            .await
            .map_err(InferenceError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                runtime_error_message(&body)
            )));
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(InferenceError::from_reqwest)?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                finished |= self.apply_pull_line(&line).await?;
            }
        }
        if !buffer.is_empty() {
            finished |= self.apply_pull_line(&buffer).await?;
        }

        if finished {
            Ok(())
        } else {
            Err(InferenceError::Transport(
                "model pull stream ended before completion".to_string(),
            ))
        }
    }

    /// 处理一行 NDJSON 进度，返回是否已完成
    async fn apply_pull_line(&self, line: &[u8]) -> Result<bool, InferenceError> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return Ok(false);
        }

        let status: PullStatus = serde_json::from_str(line).map_err(|e| {
            InferenceError::MalformedResponse(format!("invalid pull progress line: {}", e))
        })?;

        if let Some(error) = status.error {
            return Err(InferenceError::CapabilityUnavailable(format!(
                "model pull failed: {}",
                error
            )));
        }

        if let (Some(total), Some(completed)) = (status.total, status.completed) {
            if total > 0 {
                let progress = (completed as f32 / total as f32).clamp(0.0, 1.0);
                self.download.write().await.progress = Some(progress);
                tracing::debug!(progress, status = %status.status, "Model pull progress");
            }
        }

        Ok(status.status == "success")
    }
}

#[async_trait]
impl OnDeviceCapabilityPort for LocalRuntimeCapability {
    async fn probe_availability(&self) -> AvailabilityStatus {
        {
            let download = self.download.read().await;
            if download.pulling {
                return AvailabilityStatus::Downloading {
                    progress: download.progress,
                };
            }
        }

        let response = match self
            .client
            .get(self.url("/api/tags"))
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                tracing::debug!(endpoint = %self.config.endpoint, "Local runtime not reachable");
                return AvailabilityStatus::Unsupported;
            }
            Err(e) => {
                tracing::debug!(error = %e.without_url(), "Local runtime probe failed");
                return AvailabilityStatus::Unavailable;
            }
        };

        if !response.status().is_success() {
            return AvailabilityStatus::Unavailable;
        }

        match response.json::<TagsResponse>().await {
            Ok(tags) if self.has_model(&tags) => AvailabilityStatus::Ready,
            Ok(_) => AvailabilityStatus::Downloadable,
            Err(e) => {
                tracing::debug!(error = %e.without_url(), "Unexpected local runtime tags response");
                AvailabilityStatus::Unavailable
            }
        }
    }

    fn user_activation(&self) -> bool {
        self.config.allow_download
    }

    async fn start_download(&self) -> Result<(), InferenceError> {
        {
            let mut download = self.download.write().await;
            if download.pulling {
                return Ok(());
            }
            download.pulling = true;
            download.progress = None;
        }

        tracing::info!(model = %self.config.model, "Pulling on-device model");
        let result = self.pull().await;

        *self.download.write().await = DownloadState::default();
        result
    }

    async fn create_session(
        &self,
        options: &SessionOptions,
    ) -> Result<Option<Box<dyn SessionHandle>>, InferenceError> {
        Ok(Some(Box::new(LocalRuntimeSession {
            client: self.client.clone(),
            url: self.url("/api/generate"),
            model: self.config.model.clone(),
            request_timeout: self.config.request_timeout,
            options: options.clone(),
            context: None,
            released: false,
        })))
    }
}

/// 本机运行时会话
///
/// 持有运行时返回的 context，release 后失效。
struct LocalRuntimeSession {
    client: Client,
    url: String,
    model: String,
    request_timeout: Duration,
    options: SessionOptions,
    context: Option<Vec<i64>>,
    released: bool,
}

#[async_trait]
impl SessionHandle for LocalRuntimeSession {
    async fn invoke(
        &mut self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError> {
        if self.released {
            return Err(InferenceError::CapabilityUnavailable(
                "session already released".to_string(),
            ));
        }

        let images = match (&prompt.image, self.options.multimodal) {
            (Some(image), true) => vec![image.base64_data()],
            _ => Vec::new(),
        };
        let request = GenerateRequest {
            model: &self.model,
            prompt: &prompt.text,
            images,
            stream: false,
            options: GenerateOptions {
                temperature: self.options.temperature,
            },
            context: self.context.as_deref(),
        };

        let send = self
            .client
            .post(&self.url)
            .timeout(self.request_timeout)
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
            return Err(InferenceError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                runtime_error_message(&body)
            )));
        }

        let generated: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            InferenceError::MalformedResponse(format!("invalid generate response: {}", e))
        })?;
        if generated.context.is_some() {
            self.context = generated.context;
        }

        Ok(generated.response)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.context = None;
            tracing::trace!(model = %self.model, "On-device session released");
        }
    }
}

fn runtime_error_message(body: &str) -> String {
    serde_json::from_str::<RuntimeError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}
