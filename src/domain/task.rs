//! 推理任务与任务输出
//!
//! 每次用户操作创建一个任务，结果被消费后丢弃。

use serde::Serialize;

use super::image::ImagePayload;
use super::moderation::{CommentModerationVerdict, CommentText};

/// 任务类型，同一类型同一时刻只有一个在途请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    DescribeImage,
    ModerateComment,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::DescribeImage => "describe_image",
            TaskKind::ModerateComment => "moderate_comment",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 推理任务（构建后不可变）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceTask {
    /// 为图片生成替代文本
    DescribeImage { image: ImagePayload },
    /// 判断评论语气，可附带被评论的图片作为上下文
    ModerateComment {
        text: CommentText,
        image_context: Option<ImagePayload>,
    },
}

impl InferenceTask {
    pub fn describe_image(image: ImagePayload) -> Self {
        Self::DescribeImage { image }
    }

    pub fn moderate_comment(text: CommentText, image_context: Option<ImagePayload>) -> Self {
        Self::ModerateComment {
            text,
            image_context,
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Self::DescribeImage { .. } => TaskKind::DescribeImage,
            Self::ModerateComment { .. } => TaskKind::ModerateComment,
        }
    }

    /// 任务携带的图片（如有）
    pub fn image(&self) -> Option<&ImagePayload> {
        match self {
            Self::DescribeImage { image } => Some(image),
            Self::ModerateComment { image_context, .. } => image_context.as_ref(),
        }
    }
}

/// 图片描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageDescription {
    pub text: String,
    /// 因长度限制被截断，但仍保留了可用文本
    pub truncated: bool,
}

/// 任务输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskOutput {
    Description(ImageDescription),
    Verdict(CommentModerationVerdict),
}

impl TaskOutput {
    pub fn description_text(&self) -> Option<&str> {
        match self {
            TaskOutput::Description(d) => Some(&d.text),
            TaskOutput::Verdict(_) => None,
        }
    }
}
