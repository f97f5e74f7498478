//! 测试用执行器与事件记录

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::InferenceError;
use super::ports::{InferenceExecutorPort, ObservabilitySinkPort, OnDeviceExecutorPort};
use super::result::{interpret_model_text, ExecutorRoute};
use crate::domain::image::{ImagePayload, MediaType};
use crate::domain::{AvailabilityStatus, InferenceTask, TaskOutput};

/// 每个 n 生成内容不同的 JPEG 载荷
pub fn sample_image(n: u8) -> ImagePayload {
    ImagePayload::from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0, n], MediaType::Jpeg).unwrap()
}

/// 执行器脚本
#[derive(Debug, Clone)]
pub enum Script {
    /// 返回固定文本（按任务类型解析）
    Reply(String),
    /// 返回错误
    Fail(InferenceError),
    /// 永不返回（仅响应取消）
    Hang,
    /// 描述任务回显图片数据，审核任务返回无问题
    Echo,
}

impl Script {
    pub fn reply(text: &str) -> Self {
        Self::Reply(text.to_string())
    }
}

pub struct ScriptedExecutor {
    route: ExecutorRoute,
    script: Script,
    delay: Duration,
    availability: AvailabilityStatus,
    download_delay: Duration,
    download_failure: Option<InferenceError>,
    user_activation: bool,
    calls: AtomicUsize,
    downloads: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn cloud(script: Script) -> Self {
        Self::new(ExecutorRoute::Cloud, script, AvailabilityStatus::Ready)
    }

    pub fn on_device(script: Script, availability: AvailabilityStatus) -> Self {
        Self::new(ExecutorRoute::OnDevice, script, availability)
    }

    fn new(route: ExecutorRoute, script: Script, availability: AvailabilityStatus) -> Self {
        Self {
            route,
            script,
            delay: Duration::ZERO,
            availability,
            download_delay: Duration::ZERO,
            download_failure: None,
            user_activation: true,
            calls: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = delay;
        self
    }

    pub fn with_download_failure(mut self, error: InferenceError) -> Self {
        self.download_failure = Some(error);
        self
    }

    pub fn without_user_activation(mut self) -> Self {
        self.user_activation = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    async fn produce(&self, task: &InferenceTask) -> Result<TaskOutput, InferenceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.script {
            Script::Reply(text) => interpret_model_text(task, text, false),
            Script::Fail(e) => Err(e.clone()),
            Script::Hang => std::future::pending().await,
            Script::Echo => match task.image() {
                Some(image) if task.kind() == crate::domain::TaskKind::DescribeImage => {
                    interpret_model_text(task, &format!("Image {}", image.base64_data()), false)
                }
                _ => interpret_model_text(
                    task,
                    r#"{"isProblematic": false, "reason": null, "suggestion": null}"#,
                    false,
                ),
            },
        }
    }
}

#[async_trait]
impl InferenceExecutorPort for ScriptedExecutor {
    fn route(&self) -> ExecutorRoute {
        self.route
    }

    async fn execute(
        &self,
        task: &InferenceTask,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(InferenceError::Cancelled),
            outcome = self.produce(task) => outcome,
        }
    }
}

#[async_trait]
impl OnDeviceExecutorPort for ScriptedExecutor {
    async fn availability(&self) -> AvailabilityStatus {
        self.availability
    }

    fn user_activation(&self) -> bool {
        self.user_activation
    }

    async fn start_download(&self) -> Result<(), InferenceError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if !self.download_delay.is_zero() {
            tokio::time::sleep(self.download_delay).await;
        }
        match &self.download_failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// 记录所有事件的 sink
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn context_of(&self, name: &str) -> Option<Value> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ctx)| ctx.clone())
    }
}

impl ObservabilitySinkPort for RecordingSink {
    fn record(&self, event: &str, context: Value) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((event.to_string(), context));
    }
}
