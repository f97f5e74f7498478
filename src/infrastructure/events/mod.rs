//! Events - 诊断事件输出

mod publisher;

pub use publisher::{ObservedEvent, TracingEventSink};
