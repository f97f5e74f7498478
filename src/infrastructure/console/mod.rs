//! Console - 命令行输入输出

mod presenter;

pub use presenter::{render_result, ConsolePresenter, Rendered, SingleTaskSource};
