//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod console;
pub mod credentials;
pub mod events;
pub mod memory;

pub use console::{ConsolePresenter, SingleTaskSource};
pub use credentials::FileCredentialStore;
pub use events::TracingEventSink;
pub use memory::InMemoryCredentialStore;
