//! 执行结果
//!
//! 编排器对调用方只返回一个归一化的结果。

use serde::Serialize;

use super::error::{ErrorKind, InferenceError};
use crate::domain::{ImageDescription, InferenceTask, TaskOutput};

/// 结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorRoute {
    OnDevice,
    Cloud,
}

impl ExecutorRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorRoute::OnDevice => "on_device",
            ExecutorRoute::Cloud => "cloud",
        }
    }
}

impl std::fmt::Display for ExecutorRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 归一化的执行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutorResult {
    Success {
        output: TaskOutput,
        served_by: ExecutorRoute,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
    Cancelled,
}

impl ExecutorResult {
    pub fn from_outcome(outcome: Result<TaskOutput, InferenceError>, route: ExecutorRoute) -> Self {
        match outcome {
            Ok(output) => Self::Success {
                output,
                served_by: route,
            },
            Err(InferenceError::Cancelled) => Self::Cancelled,
            Err(e) => Self::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn output(&self) -> Option<&TaskOutput> {
        match self {
            Self::Success { output, .. } => Some(output),
            _ => None,
        }
    }

    pub fn served_by(&self) -> Option<ExecutorRoute> {
        match self {
            Self::Success { served_by, .. } => Some(*served_by),
            _ => None,
        }
    }
}

/// 把模型原始文本解释为任务输出
///
/// 端侧与云端执行器共用：描述任务做清理，审核任务解析 JSON 结论。
pub fn interpret_model_text(
    task: &InferenceTask,
    raw: &str,
    truncated: bool,
) -> Result<TaskOutput, InferenceError> {
    match task {
        InferenceTask::DescribeImage { .. } => {
            let text = clean_description(raw);
            if text.is_empty() {
                return Err(InferenceError::MalformedResponse(
                    "model returned an empty description".to_string(),
                ));
            }
            Ok(TaskOutput::Description(ImageDescription { text, truncated }))
        }
        InferenceTask::ModerateComment { .. } => {
            let verdict = crate::domain::moderation::parse_verdict(raw)?;
            Ok(TaskOutput::Verdict(verdict))
        }
    }
}

fn clean_description(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::{ImagePayload, MediaType};
    use crate::domain::moderation::CommentText;

    fn describe_task() -> InferenceTask {
        InferenceTask::describe_image(
            ImagePayload::from_bytes(&[0xFF, 0xD8, 0xFF], MediaType::Jpeg).unwrap(),
        )
    }

    #[test]
    fn test_description_is_cleaned() {
        let output =
            interpret_model_text(&describe_task(), "  \"A red bicycle.\"\n", false).unwrap();
        assert_eq!(output.description_text(), Some("A red bicycle."));
    }

    #[test]
    fn test_empty_description_is_malformed() {
        let err = interpret_model_text(&describe_task(), " \n ", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_moderation_parse_failure_is_malformed() {
        let task = InferenceTask::moderate_comment(CommentText::new("meh").unwrap(), None);
        let err = interpret_model_text(&task, "looks fine", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_cancelled_outcome_is_not_a_failure() {
        let result = ExecutorResult::from_outcome(Err(InferenceError::Cancelled), ExecutorRoute::Cloud);
        assert_eq!(result, ExecutorResult::Cancelled);
    }

    #[test]
    fn test_failure_keeps_message_verbatim() {
        let result = ExecutorResult::from_outcome(
            Err(InferenceError::Transport("HTTP 503: overloaded".to_string())),
            ExecutorRoute::Cloud,
        );
        assert_eq!(
            result,
            ExecutorResult::Failure {
                kind: ErrorKind::Transport,
                message: "Transport error: HTTP 503: overloaded".to_string(),
            }
        );
    }
}
