//! Event Sink Implementation
//!
//! 诊断事件写入 tracing，同时广播给订阅者（测试或外层界面）

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::application::ports::ObservabilitySinkPort;

/// 一条诊断事件
#[derive(Debug, Clone, Serialize)]
pub struct ObservedEvent {
    pub name: String,
    pub context: Value,
    pub recorded_at: DateTime<Utc>,
}

/// 事件 sink
///
/// 以 `failure` 结尾的事件按 warn 级别记录，其余按 info。
pub struct TracingEventSink {
    channel: broadcast::Sender<ObservedEvent>,
}

impl TracingEventSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅之后记录的事件
    pub fn subscribe(&self) -> broadcast::Receiver<ObservedEvent> {
        self.channel.subscribe()
    }
}

impl Default for TracingEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservabilitySinkPort for TracingEventSink {
    fn record(&self, event: &str, context: Value) {
        if event.ends_with("failure") || event.ends_with("failed") {
            tracing::warn!(event = %event, context = %context, "Inference event");
        } else {
            tracing::info!(event = %event, context = %context, "Inference event");
        }

        let observed = ObservedEvent {
            name: event.to_string(),
            context,
            recorded_at: Utc::now(),
        };
        if let Err(e) = self.channel.send(observed) {
            tracing::trace!(event = %e.0.name, "No event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribers_receive_events() {
        let sink = TracingEventSink::new();
        let mut rx = sink.subscribe();

        sink.record("cloud.failure", json!({ "kind": "transport" }));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, "cloud.failure");
        assert_eq!(event.context["kind"], "transport");
    }

    #[test]
    fn test_record_without_subscribers() {
        let sink = TracingEventSink::default();
        sink.record("on_device.skipped", json!({}));
    }
}
