//! Observability Sink Port - 诊断事件
//!
//! 只约定 "事件名 + 自由格式上下文"，不规定结构化 schema。

use serde_json::Value;

/// 事件名
pub mod events {
    pub const ON_DEVICE_SKIPPED: &str = "on_device.skipped";
    pub const ON_DEVICE_FALLBACK: &str = "on_device.fallback";
    pub const ON_DEVICE_SERVED: &str = "on_device.served";
    pub const DOWNLOAD_STARTED: &str = "on_device.download_started";
    pub const DOWNLOAD_FINISHED: &str = "on_device.download_finished";
    pub const DOWNLOAD_FAILED: &str = "on_device.download_failed";
    pub const CLOUD_SERVED: &str = "cloud.served";
    pub const CLOUD_FAILURE: &str = "cloud.failure";
    pub const TASK_SUPERSEDED: &str = "task.superseded";
}

/// Observability Sink Port
pub trait ObservabilitySinkPort: Send + Sync {
    fn record(&self, event: &str, context: Value);
}
