//! Memory Layer - In-Memory State
//!
//! 不落盘的端口实现

mod credential_store;

pub use credential_store::InMemoryCredentialStore;
