//! Hybrid Inference Orchestrator
//!
//! 端侧优先、云端兜底的推理编排：
//! 1. 同类任务的旧尝试被新尝试取代（取消）
//! 2. 端侧可用时限时执行，失败 / 超时 / 答非所问则回退
//! 3. 端侧可下载且已获用户激活时在后台触发下载，本次请求直接走云端
//! 4. 云端错误原样返回给调用方

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::InferenceError;
use super::ports::{events, InferenceExecutorPort, ObservabilitySinkPort, OnDeviceExecutorPort};
use super::result::{ExecutorResult, ExecutorRoute};
use crate::domain::{
    AvailabilityStatus, DefaultNonAnswerPredicate, InferenceTask, NonAnswerPredicate, TaskKind,
    TaskOutput,
};

/// 默认端侧等待上限
pub const DEFAULT_ON_DEVICE_TIMEOUT: Duration = Duration::from_millis(5000);

/// 编排配置
#[derive(Clone)]
pub struct OrchestratorOptions {
    /// 端侧单次尝试的等待上限
    pub on_device_timeout: Duration,
    /// 端侧状态为 downloadable 时是否在后台触发下载
    pub background_download: bool,
    /// 端侧描述结果的"答非所问"判断
    pub non_answer: Arc<dyn NonAnswerPredicate>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            on_device_timeout: DEFAULT_ON_DEVICE_TIMEOUT,
            background_download: true,
            non_answer: Arc::new(DefaultNonAnswerPredicate),
        }
    }
}

impl fmt::Debug for OrchestratorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorOptions")
            .field("on_device_timeout", &self.on_device_timeout)
            .field("background_download", &self.background_download)
            .finish_non_exhaustive()
    }
}

/// 端侧未能给出结果的原因
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    Unsupported,
    Unavailable,
    Downloadable,
    Downloading,
    Failed(InferenceError),
    TimedOut,
    NonAnswer,
}

impl FallbackReason {
    fn from_status(status: AvailabilityStatus) -> Option<Self> {
        match status {
            AvailabilityStatus::Ready => None,
            AvailabilityStatus::Unsupported => Some(Self::Unsupported),
            AvailabilityStatus::Unavailable => Some(Self::Unavailable),
            AvailabilityStatus::Downloadable => Some(Self::Downloadable),
            AvailabilityStatus::Downloading { .. } => Some(Self::Downloading),
        }
    }

    /// 端侧是否真正执行过
    pub fn attempted(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::TimedOut | Self::NonAnswer)
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => f.write_str("unsupported"),
            Self::Unavailable => f.write_str("unavailable"),
            Self::Downloadable => f.write_str("downloadable"),
            Self::Downloading => f.write_str("downloading"),
            Self::Failed(e) => write!(f, "failed: {}", e),
            Self::TimedOut => f.write_str("timed out"),
            Self::NonAnswer => f.write_str("non-answer"),
        }
    }
}

/// 某类任务当前的在途尝试
struct InFlight {
    attempt_id: Uuid,
    token: CancellationToken,
}

/// 混合推理编排器
///
/// 取消句柄与下载标记都是实例字段，多个实例互不影响。
pub struct HybridOrchestrator {
    cloud: Arc<dyn InferenceExecutorPort>,
    on_device: Option<Arc<dyn OnDeviceExecutorPort>>,
    sink: Arc<dyn ObservabilitySinkPort>,
    options: OrchestratorOptions,
    in_flight: DashMap<TaskKind, InFlight>,
    download_pending: Arc<AtomicBool>,
    download_task: Mutex<Option<JoinHandle<()>>>,
}

impl HybridOrchestrator {
    pub fn new(
        cloud: Arc<dyn InferenceExecutorPort>,
        on_device: Option<Arc<dyn OnDeviceExecutorPort>>,
        sink: Arc<dyn ObservabilitySinkPort>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            cloud,
            on_device,
            sink,
            options,
            in_flight: DashMap::new(),
            download_pending: Arc::new(AtomicBool::new(false)),
            download_task: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// 是否有后台下载在进行
    pub fn download_pending(&self) -> bool {
        self.download_pending.load(Ordering::Acquire)
    }

    /// 等待后台下载结束，没有下载时立即返回
    pub async fn wait_for_download(&self) {
        let handle = self
            .download_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Background download task aborted");
            }
        }
    }

    /// 执行一次任务
    ///
    /// 同类任务的上一次尝试会被取消，其结果为 `Cancelled`。
    pub async fn run(&self, task: InferenceTask) -> ExecutorResult {
        let kind = task.kind();
        let attempt_id = Uuid::new_v4();
        let token = CancellationToken::new();

        if let Some(previous) = self.in_flight.insert(
            kind,
            InFlight {
                attempt_id,
                token: token.clone(),
            },
        ) {
            previous.token.cancel();
            tracing::debug!(task_kind = %kind, superseded = %previous.attempt_id, "Superseded in-flight attempt");
            self.sink.record(
                events::TASK_SUPERSEDED,
                json!({ "task_kind": kind.as_str(), "attempt_id": previous.attempt_id.to_string() }),
            );
        }

        let result = self.run_attempt(&task, &token).await;

        self.in_flight
            .remove_if(&kind, |_, current| current.attempt_id == attempt_id);

        match &result {
            ExecutorResult::Success { served_by, .. } => {
                tracing::info!(task_kind = %kind, served_by = %served_by, "Task completed");
            }
            ExecutorResult::Failure { kind: error_kind, message } => {
                tracing::warn!(task_kind = %kind, error_kind = %error_kind.as_str(), error = %message, "Task failed");
            }
            ExecutorResult::Cancelled => {
                tracing::debug!(task_kind = %kind, %attempt_id, "Task cancelled");
            }
        }

        result
    }

    async fn run_attempt(&self, task: &InferenceTask, token: &CancellationToken) -> ExecutorResult {
        let kind = task.kind();

        if let Some(on_device) = &self.on_device {
            match self.try_on_device(on_device, task, token).await {
                Ok(output) => {
                    self.sink
                        .record(events::ON_DEVICE_SERVED, json!({ "task_kind": kind.as_str() }));
                    return ExecutorResult::Success {
                        output,
                        served_by: ExecutorRoute::OnDevice,
                    };
                }
                Err(_) if token.is_cancelled() => return ExecutorResult::Cancelled,
                Err(reason) => {
                    let event = if reason.attempted() {
                        events::ON_DEVICE_FALLBACK
                    } else {
                        events::ON_DEVICE_SKIPPED
                    };
                    tracing::debug!(task_kind = %kind, reason = %reason, "Falling back to cloud");
                    self.sink.record(
                        event,
                        json!({ "task_kind": kind.as_str(), "reason": reason.to_string() }),
                    );
                }
            }
        }

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(InferenceError::Cancelled),
            outcome = self.cloud.execute(task, token) => outcome,
        };

        match &outcome {
            Ok(_) => {
                self.sink
                    .record(events::CLOUD_SERVED, json!({ "task_kind": kind.as_str() }));
            }
            Err(InferenceError::Cancelled) => {}
            Err(e) => {
                self.sink.record(
                    events::CLOUD_FAILURE,
                    json!({
                        "task_kind": kind.as_str(),
                        "kind": e.kind().as_str(),
                        "message": e.to_string(),
                    }),
                );
            }
        }

        ExecutorResult::from_outcome(outcome, self.cloud.route())
    }

    /// 端侧尝试：探测 -> 限时执行 -> 结果校验
    async fn try_on_device(
        &self,
        on_device: &Arc<dyn OnDeviceExecutorPort>,
        task: &InferenceTask,
        token: &CancellationToken,
    ) -> Result<TaskOutput, FallbackReason> {
        let status = on_device.availability().await;
        tracing::debug!(task_kind = %task.kind(), status = %status, "On-device availability");

        if let Some(reason) = FallbackReason::from_status(status) {
            if reason == FallbackReason::Downloadable {
                if !on_device.user_activation() {
                    tracing::debug!(task_kind = %task.kind(), "On-device download not activated");
                    return Err(FallbackReason::Unavailable);
                }
                self.start_background_download(on_device);
            }
            return Err(reason);
        }

        // 在独立任务中执行，超时后 JoinHandle 被丢弃，迟到的结果不再被读取
        let executor = Arc::clone(on_device);
        let owned_task = task.clone();
        let child = token.child_token();
        let handle = tokio::spawn(async move { executor.execute(&owned_task, &child).await });

        let joined = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(FallbackReason::Failed(InferenceError::Cancelled)),
            joined = tokio::time::timeout(self.options.on_device_timeout, handle) => joined,
        };

        let output = match joined {
            Err(_) => return Err(FallbackReason::TimedOut),
            Ok(Err(join_error)) => {
                return Err(FallbackReason::Failed(InferenceError::CapabilityUnavailable(
                    format!("on-device attempt aborted: {}", join_error),
                )))
            }
            Ok(Ok(Err(e))) => return Err(FallbackReason::Failed(e)),
            Ok(Ok(Ok(output))) => output,
        };

        if let Some(text) = output.description_text() {
            if self.options.non_answer.is_non_answer(text) {
                return Err(FallbackReason::NonAnswer);
            }
        }

        Ok(output)
    }

    /// 后台下载，同一时刻最多一个
    fn start_background_download(&self, on_device: &Arc<dyn OnDeviceExecutorPort>) {
        if !self.options.background_download {
            return;
        }
        if self
            .download_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("On-device download already pending");
            return;
        }

        let executor = Arc::clone(on_device);
        let sink = Arc::clone(&self.sink);
        let pending = Arc::clone(&self.download_pending);

        sink.record(events::DOWNLOAD_STARTED, json!({}));
        tracing::info!("Starting background on-device model download");

        let handle = tokio::spawn(async move {
            match executor.start_download().await {
                Ok(()) => {
                    tracing::info!("On-device model download finished");
                    sink.record(events::DOWNLOAD_FINISHED, json!({}));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "On-device model download failed");
                    sink.record(
                        events::DOWNLOAD_FAILED,
                        json!({ "kind": e.kind().as_str(), "message": e.to_string() }),
                    );
                }
            }
            pending.store(false, Ordering::Release);
        });
        *self
            .download_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }
}
