//! 应用层 - 命令
//!
//! 每个命令对应一次推理任务

mod inference_commands;

pub mod handlers;

pub use inference_commands::*;
