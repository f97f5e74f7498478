//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod cloud;
pub mod on_device;

#[cfg(test)]
pub(crate) mod test_server;

pub use cloud::*;
pub use on_device::*;
