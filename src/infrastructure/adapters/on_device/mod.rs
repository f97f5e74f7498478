//! On-device Adapter - 本地推理执行器与能力实现

mod executor;
mod fake_capability;
mod local_runtime;

pub use executor::{OnDeviceExecutor, SessionGuard};
pub use fake_capability::FakeCapability;
pub use local_runtime::{LocalRuntimeCapability, LocalRuntimeConfig};
