//! On-device Capability Port - 本地推理能力抽象
//!
//! 对平台提供的本地模型能力建模：探测、创建会话、调用、释放。

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::application::error::InferenceError;
use crate::domain::{AvailabilityStatus, Prompt};

/// 会话创建参数
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// 是否需要图片输入
    pub multimodal: bool,
    /// 采样温度
    pub temperature: f32,
}

/// 本地推理会话
///
/// 调用方负责在所有路径上调用 `release`（见 `SessionGuard`）。
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// 提交 prompt 并返回原始文本
    async fn invoke(
        &mut self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError>;

    /// 释放会话资源（幂等）
    fn release(&mut self);
}

/// On-device Capability Port
#[async_trait]
pub trait OnDeviceCapabilityPort: Send + Sync {
    /// 探测当前可用性
    async fn probe_availability(&self) -> AvailabilityStatus;

    /// 是否持有用户激活（允许触发大体积模型下载）
    fn user_activation(&self) -> bool;

    /// 开始下载模型，下载完成或失败时返回
    async fn start_download(&self) -> Result<(), InferenceError>;

    /// 创建会话；能力存在但暂时无法建立会话时返回 `Ok(None)`
    async fn create_session(
        &self,
        options: &SessionOptions,
    ) -> Result<Option<Box<dyn SessionHandle>>, InferenceError>;
}
