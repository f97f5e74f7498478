//! Inference Commands - 描述与审核命令

use crate::application::error::ApplicationError;
use crate::domain::image::ImagePayload;
use crate::domain::moderation::CommentText;
use crate::domain::InferenceTask;

/// 生成图片替代文本
#[derive(Debug, Clone)]
pub struct DescribeImageCommand {
    pub image: ImagePayload,
}

impl DescribeImageCommand {
    pub fn into_task(self) -> InferenceTask {
        InferenceTask::describe_image(self.image)
    }
}

/// 审核评论
#[derive(Debug, Clone)]
pub struct ModerateCommentCommand {
    pub text: String,
    /// 评论所针对的图片（可选）
    pub image_context: Option<ImagePayload>,
}

impl ModerateCommentCommand {
    pub fn into_task(self) -> Result<InferenceTask, ApplicationError> {
        let text = CommentText::new(self.text).map_err(ApplicationError::validation)?;
        Ok(InferenceTask::moderate_comment(text, self.image_context))
    }
}
