//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（执行器、端侧能力、凭证、诊断事件、输入输出）
//! - orchestrator: 端侧优先、云端兜底的混合编排器
//! - commands: 描述 / 审核命令及处理器
//! - error / result: 错误分类与归一化结果

pub mod commands;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod result;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use commands::{handlers::InferenceCommandHandler, DescribeImageCommand, ModerateCommentCommand};
pub use error::{ApplicationError, ErrorKind, InferenceError};
pub use orchestrator::{FallbackReason, HybridOrchestrator, OrchestratorOptions};
pub use ports::{
    CredentialStorePort, InferenceExecutorPort, ObservabilitySinkPort, OnDeviceCapabilityPort,
    OnDeviceExecutorPort, ResultPresenterPort, SessionHandle, SessionOptions, TaskSourcePort,
};
pub use result::{ExecutorResult, ExecutorRoute};
