//! altlens - 图片替代文本与评论语气检查
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Image Context: 图片载荷、媒体类型
//! - Moderation Context: 评论文本、审核结论与解析
//! - 任务模型、可用性状态、Prompt、答非所问检测
//!
//! 应用层 (application/):
//! - Ports: 端口定义（执行器、端侧能力、凭证、诊断事件、任务来源与结果展示）
//! - Orchestrator: 端侧优先、云端兜底的混合编排
//! - Commands: 描述 / 审核命令处理器
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: Gemini 云端执行器、本机运行时端侧执行器
//! - Credentials: API key 文件存储
//! - Console: 命令行结果展示
//! - Events: 诊断事件（tracing + broadcast）
//! - Memory: 内存凭证存储

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{ExecutorResult, HybridOrchestrator, OrchestratorOptions};
pub use config::{load_config, AppConfig};
