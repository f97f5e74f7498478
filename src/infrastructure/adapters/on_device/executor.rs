//! On-device Executor - 基于本地能力的执行器
//!
//! 每次调用创建一个会话，结束时（包括出错与取消）通过 SessionGuard 释放。
//! execute 不再探测可用性，由编排器在调用前探测。

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::application::error::InferenceError;
use crate::application::ports::{
    InferenceExecutorPort, OnDeviceCapabilityPort, OnDeviceExecutorPort, SessionHandle,
    SessionOptions,
};
use crate::application::result::{interpret_model_text, ExecutorRoute};
use crate::domain::{AvailabilityStatus, InferenceTask, Prompt, TaskOutput};

/// 会话守卫，Drop 时释放会话
pub struct SessionGuard {
    session: Box<dyn SessionHandle>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn SessionHandle>) -> Self {
        Self { session }
    }

    pub async fn invoke(
        &mut self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError> {
        self.session.invoke(prompt, cancel).await
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.release();
    }
}

/// 端侧执行器
pub struct OnDeviceExecutor {
    capability: Arc<dyn OnDeviceCapabilityPort>,
    temperature: f32,
}

impl OnDeviceExecutor {
    pub fn new(capability: Arc<dyn OnDeviceCapabilityPort>, temperature: f32) -> Self {
        Self {
            capability,
            temperature,
        }
    }
}

#[async_trait]
impl InferenceExecutorPort for OnDeviceExecutor {
    fn route(&self) -> ExecutorRoute {
        ExecutorRoute::OnDevice
    }

    async fn execute(
        &self,
        task: &InferenceTask,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, InferenceError> {
        let prompt = Prompt::for_task(task);
        let options = SessionOptions {
            multimodal: prompt.is_multimodal(),
            temperature: self.temperature,
        };

        let session = self
            .capability
            .create_session(&options)
            .await?
            .ok_or_else(|| {
                InferenceError::CapabilityUnavailable(
                    "on-device session could not be created".to_string(),
                )
            })?;
        let mut session = SessionGuard::new(session);

        tracing::debug!(
            task_kind = %task.kind(),
            multimodal = options.multimodal,
            "Invoking on-device session"
        );
        let raw = session.invoke(&prompt, cancel).await?;

        interpret_model_text(task, &raw, false)
    }
}

#[async_trait]
impl OnDeviceExecutorPort for OnDeviceExecutor {
    async fn availability(&self) -> AvailabilityStatus {
        self.capability.probe_availability().await
    }

    fn user_activation(&self) -> bool {
        self.capability.user_activation()
    }

    async fn start_download(&self) -> Result<(), InferenceError> {
        if !self.capability.user_activation() {
            return Err(InferenceError::CapabilityUnavailable(
                "model download requires user activation".to_string(),
            ));
        }
        self.capability.start_download().await
    }
}
