//! Console Presenter / Task Source
//!
//! 实现 ResultPresenterPort 与 TaskSourcePort，供命令行使用

use std::sync::{Mutex, PoisonError};

use crate::application::error::ErrorKind;
use crate::application::ports::{ResultPresenterPort, TaskSourcePort};
use crate::application::result::ExecutorResult;
use crate::domain::{InferenceTask, TaskOutput};

/// 渲染结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Stdout(String),
    Stderr(String),
    /// 被取代的任务不输出
    Silent,
}

/// 把执行结果渲染为终端文本
pub fn render_result(result: &ExecutorResult) -> Rendered {
    match result {
        ExecutorResult::Success { output, served_by } => match output {
            TaskOutput::Description(description) => {
                let mut text = description.text.clone();
                if description.truncated {
                    text.push_str(" (truncated)");
                }
                tracing::debug!(served_by = %served_by, "Rendering description");
                Rendered::Stdout(text)
            }
            TaskOutput::Verdict(verdict) if verdict.is_problematic => {
                let mut lines = vec!["flagged".to_string()];
                if let Some(reason) = &verdict.reason {
                    lines.push(format!("reason: {}", reason));
                }
                if let Some(suggestion) = &verdict.suggestion {
                    lines.push(format!("suggestion: {}", suggestion));
                }
                Rendered::Stdout(lines.join("\n"))
            }
            TaskOutput::Verdict(_) => Rendered::Stdout("ok".to_string()),
        },
        ExecutorResult::Failure { kind, message } => {
            let mut text = format!("error ({}): {}", kind.as_str(), message);
            if *kind == ErrorKind::Configuration {
                text.push_str("\nhint: run `altlens set-key <API_KEY>` to store a cloud API key");
            }
            Rendered::Stderr(text)
        }
        ExecutorResult::Cancelled => Rendered::Silent,
    }
}

/// 终端结果展示
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl ConsolePresenter {
    pub fn new() -> Self {
        Self
    }
}

impl ResultPresenterPort for ConsolePresenter {
    fn present_result(&self, task: &InferenceTask, result: &ExecutorResult) {
        tracing::debug!(task_kind = %task.kind(), "Presenting result");
        match render_result(result) {
            Rendered::Stdout(text) => println!("{}", text),
            Rendered::Stderr(text) => eprintln!("{}", text),
            Rendered::Silent => {}
        }
    }
}

/// 只提供一个任务的任务来源（命令行参数）
pub struct SingleTaskSource {
    task: Mutex<Option<InferenceTask>>,
}

impl SingleTaskSource {
    pub fn new(task: InferenceTask) -> Self {
        Self {
            task: Mutex::new(Some(task)),
        }
    }
}

impl TaskSourcePort for SingleTaskSource {
    fn get_task_input(&self) -> Option<InferenceTask> {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::InferenceError;
    use crate::application::result::ExecutorRoute;
    use crate::domain::moderation::CommentModerationVerdict;
    use crate::domain::ImageDescription;

    #[test]
    fn test_truncated_description_is_marked() {
        let result = ExecutorResult::Success {
            output: TaskOutput::Description(ImageDescription {
                text: "A long description".to_string(),
                truncated: true,
            }),
            served_by: ExecutorRoute::Cloud,
        };
        assert_eq!(
            render_result(&result),
            Rendered::Stdout("A long description (truncated)".to_string())
        );
    }

    #[test]
    fn test_flagged_verdict() {
        let result = ExecutorResult::Success {
            output: TaskOutput::Verdict(CommentModerationVerdict {
                is_problematic: true,
                reason: Some("insulting".to_string()),
                suggestion: Some("I'd frame this differently.".to_string()),
            }),
            served_by: ExecutorRoute::OnDevice,
        };
        assert_eq!(
            render_result(&result),
            Rendered::Stdout(
                "flagged\nreason: insulting\nsuggestion: I'd frame this differently.".to_string()
            )
        );
    }

    #[test]
    fn test_acceptable_verdict() {
        let result = ExecutorResult::Success {
            output: TaskOutput::Verdict(CommentModerationVerdict::acceptable()),
            served_by: ExecutorRoute::Cloud,
        };
        assert_eq!(render_result(&result), Rendered::Stdout("ok".to_string()));
    }

    #[test]
    fn test_configuration_failure_has_hint() {
        let result =
            ExecutorResult::from_outcome(Err(InferenceError::missing_credential()), ExecutorRoute::Cloud);
        match render_result(&result) {
            Rendered::Stderr(text) => {
                assert!(text.starts_with("error (configuration):"));
                assert!(text.contains("altlens set-key"));
            }
            other => panic!("unexpected rendering: {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_is_silent() {
        assert_eq!(render_result(&ExecutorResult::Cancelled), Rendered::Silent);
    }

    #[test]
    fn test_single_task_source_yields_once() {
        let image = crate::domain::image::ImagePayload::from_bytes(
            &[0x89, b'P', b'N', b'G'],
            crate::domain::image::MediaType::Png,
        )
        .unwrap();
        let source = SingleTaskSource::new(InferenceTask::describe_image(image));
        assert!(source.get_task_input().is_some());
        assert!(source.get_task_input().is_none());
    }
}
