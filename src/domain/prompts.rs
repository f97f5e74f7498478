//! Prompt 构建
//!
//! 端侧与云端共用同一套指令文本，保证两条路径的输出可以用同一个解析器处理。

use super::image::ImagePayload;
use super::task::InferenceTask;

/// 提交给模型的一次请求：指令文本 + 可选图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub image: Option<ImagePayload>,
}

impl Prompt {
    pub fn for_task(task: &InferenceTask) -> Self {
        match task {
            InferenceTask::DescribeImage { image } => Self {
                text: describe_image_instruction().to_string(),
                image: Some(image.clone()),
            },
            InferenceTask::ModerateComment {
                text,
                image_context,
            } => Self {
                text: moderation_instruction(text.as_str(), image_context.is_some()),
                image: image_context.clone(),
            },
        }
    }

    pub fn is_multimodal(&self) -> bool {
        self.image.is_some()
    }
}

fn describe_image_instruction() -> &'static str {
    "Write alt text for the attached image. Use one or two plain sentences that \
     describe the important visual content for someone who cannot see it. \
     Do not begin with \"Image of\" or \"Picture of\". Reply with the alt text only."
}

fn moderation_instruction(comment: &str, has_image: bool) -> String {
    let context = if has_image {
        "The image the comment was left on is attached for context.\n\n"
    } else {
        ""
    };

    format!(
        r#"You review comments left on a shared photo before they are displayed.
Decide whether the comment is hostile, insulting, harassing, or discouraging without explanation.
{context}Respond with only a JSON object with exactly these fields:
{{
  "isProblematic": true or false,
  "reason": "why the comment is problematic (required when isProblematic is true, otherwise empty)",
  "suggestion": "a rewrite that keeps the author's intent and tone but removes hostility (empty when not problematic)"
}}

Comment:
"""
{comment}
""""#,
        context = context,
        comment = comment
    )
}
