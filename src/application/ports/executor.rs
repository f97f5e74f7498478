//! Executor Port - 推理执行器抽象
//!
//! 端侧与云端执行器的统一接口，具体实现在 infrastructure/adapters 层。
//! 执行器只做一次尝试，不在内部重试；重试与回退策略由编排器负责。

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::application::error::InferenceError;
use crate::application::result::ExecutorRoute;
use crate::domain::{AvailabilityStatus, InferenceTask, TaskOutput};

/// Inference Executor Port
#[async_trait]
pub trait InferenceExecutorPort: Send + Sync {
    /// 执行器所在路径（用于日志与结果标注）
    fn route(&self) -> ExecutorRoute;

    /// 执行一次推理
    ///
    /// 必须观察 `cancel`：取消后尽快返回 `InferenceError::Cancelled`。
    async fn execute(
        &self,
        task: &InferenceTask,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, InferenceError>;
}

/// On-device Executor Port
///
/// 在执行器之外额外暴露可用性探测与模型下载
#[async_trait]
pub trait OnDeviceExecutorPort: InferenceExecutorPort {
    /// 探测可用性，不返回错误
    async fn availability(&self) -> AvailabilityStatus;

    /// 模型下载是否已获用户激活
    ///
    /// 未激活时编排器不会发起下载，端侧按不可用处理。
    fn user_activation(&self) -> bool;

    /// 触发模型下载
    ///
    /// 需要用户激活；缺少激活时返回 `CapabilityUnavailable`。
    async fn start_download(&self) -> Result<(), InferenceError>;
}
