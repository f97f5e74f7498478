//! Task Source / Result Presenter Ports
//!
//! 把输入采集与结果展示隔离在窄接口之后，编排器不依赖任何界面。

use crate::application::result::ExecutorResult;
use crate::domain::InferenceTask;

/// 任务来源
pub trait TaskSourcePort: Send + Sync {
    /// 取下一个待执行任务，没有时返回 None
    fn get_task_input(&self) -> Option<InferenceTask>;
}

/// 结果展示
pub trait ResultPresenterPort: Send + Sync {
    fn present_result(&self, task: &InferenceTask, result: &ExecutorResult);
}
