//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod credential_store;
mod executor;
mod observability;
mod on_device_capability;
mod presenter;

pub use credential_store::CredentialStorePort;
pub use executor::{InferenceExecutorPort, OnDeviceExecutorPort};
pub use observability::{events, ObservabilitySinkPort};
pub use on_device_capability::{OnDeviceCapabilityPort, SessionHandle, SessionOptions};
pub use presenter::{ResultPresenterPort, TaskSourcePort};
