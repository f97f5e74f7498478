//! Moderation Context - 评论语气审核
//!
//! 职责:
//! - 评论文本校验
//! - 审核结论的防御式解析

mod comment;
mod verdict;

pub use comment::CommentText;
pub use verdict::{extract_json_object, parse_verdict, CommentModerationVerdict, VerdictError};
