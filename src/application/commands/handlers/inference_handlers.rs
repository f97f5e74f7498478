//! Inference Command Handlers

use std::sync::Arc;

use crate::application::orchestrator::HybridOrchestrator;
use crate::application::ports::{ResultPresenterPort, TaskSourcePort};
use crate::application::result::ExecutorResult;
use crate::domain::InferenceTask;

/// 推理命令处理器
///
/// 从任务来源取任务，交给编排器执行，并把结果送到展示端口。
pub struct InferenceCommandHandler {
    orchestrator: Arc<HybridOrchestrator>,
    presenter: Arc<dyn ResultPresenterPort>,
}

impl InferenceCommandHandler {
    pub fn new(
        orchestrator: Arc<HybridOrchestrator>,
        presenter: Arc<dyn ResultPresenterPort>,
    ) -> Self {
        Self {
            orchestrator,
            presenter,
        }
    }

    /// 从任务来源取一个任务执行；来源为空时返回 None
    pub async fn run_from_source(&self, source: &dyn TaskSourcePort) -> Option<ExecutorResult> {
        let task = source.get_task_input()?;
        Some(self.execute(task).await)
    }

    async fn execute(&self, task: InferenceTask) -> ExecutorResult {
        match task.image() {
            Some(image) => tracing::info!(
                task_kind = %task.kind(),
                media_type = %image.media_type().as_str(),
                approx_bytes = image.approx_decoded_len(),
                "Inference requested"
            ),
            None => tracing::info!(task_kind = %task.kind(), "Inference requested"),
        }
        let result = self.orchestrator.run(task.clone()).await;
        self.presenter.present_result(&task, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::application::orchestrator::OrchestratorOptions;
    use crate::application::result::ExecutorRoute;
    use crate::application::testing::{sample_image, RecordingSink, Script, ScriptedExecutor};
    use crate::domain::moderation::CommentText;
    use crate::domain::TaskKind;

    #[derive(Default)]
    struct CapturingPresenter {
        presented: Mutex<Vec<(TaskKind, ExecutorResult)>>,
    }

    impl ResultPresenterPort for CapturingPresenter {
        fn present_result(&self, task: &InferenceTask, result: &ExecutorResult) {
            self.presented
                .lock()
                .unwrap()
                .push((task.kind(), result.clone()));
        }
    }

    struct OneShotSource(Mutex<Option<InferenceTask>>);

    impl TaskSourcePort for OneShotSource {
        fn get_task_input(&self) -> Option<InferenceTask> {
            self.0.lock().unwrap().take()
        }
    }

    fn handler(cloud: &Arc<ScriptedExecutor>) -> (InferenceCommandHandler, Arc<CapturingPresenter>) {
        let orchestrator = Arc::new(HybridOrchestrator::new(
            cloud.clone(),
            None,
            Arc::new(RecordingSink::default()),
            OrchestratorOptions::default(),
        ));
        let presenter = Arc::new(CapturingPresenter::default());
        (
            InferenceCommandHandler::new(orchestrator, presenter.clone()),
            presenter,
        )
    }

    fn source(task: InferenceTask) -> OneShotSource {
        OneShotSource(Mutex::new(Some(task)))
    }

    #[tokio::test]
    async fn test_describe_presents_result() {
        let cloud = Arc::new(ScriptedExecutor::cloud(Script::reply("A mountain lake.")));
        let (handler, presenter) = handler(&cloud);

        let result = handler
            .run_from_source(&source(InferenceTask::describe_image(sample_image(7))))
            .await
            .unwrap();

        assert_eq!(result.served_by(), Some(ExecutorRoute::Cloud));
        let presented = presenter.presented.lock().unwrap();
        assert_eq!(presented.len(), 1);
        assert_eq!(presented[0].0, TaskKind::DescribeImage);
        assert_eq!(presented[0].1, result);
    }

    #[tokio::test]
    async fn test_moderation_presents_verdict() {
        let cloud = Arc::new(ScriptedExecutor::cloud(Script::reply(
            r#"{"isProblematic": false, "reason": null, "suggestion": null}"#,
        )));
        let (handler, presenter) = handler(&cloud);
        let text = CommentText::new("Great colors").unwrap();

        let result = handler
            .run_from_source(&source(InferenceTask::moderate_comment(text, None)))
            .await
            .unwrap();

        assert!(result.is_success());
        let presented = presenter.presented.lock().unwrap();
        assert_eq!(presented[0].0, TaskKind::ModerateComment);
    }

    #[tokio::test]
    async fn test_run_from_source_drains_once() {
        let cloud = Arc::new(ScriptedExecutor::cloud(Script::reply("A foggy street.")));
        let (handler, presenter) = handler(&cloud);
        let source = source(InferenceTask::describe_image(sample_image(3)));

        assert!(handler.run_from_source(&source).await.is_some());
        assert!(handler.run_from_source(&source).await.is_none());
        assert_eq!(cloud.calls(), 1);
        assert_eq!(presenter.presented.lock().unwrap().len(), 1);
    }
}
