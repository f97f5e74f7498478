//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Image Context: 图片载荷与媒体类型
//! - Moderation Context: 评论文本与审核结论
//!
//! 以及两者共享的任务模型、可用性状态、Prompt 与无效回答检测。

pub mod image;
pub mod moderation;

mod availability;
mod heuristics;
mod prompts;
mod task;

pub use availability::AvailabilityStatus;
pub use heuristics::{looks_like_non_answer, DefaultNonAnswerPredicate, NonAnswerPredicate};
pub use prompts::Prompt;
pub use task::{ImageDescription, InferenceTask, TaskKind, TaskOutput};
