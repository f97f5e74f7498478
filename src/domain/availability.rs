//! 端侧模型可用性状态
//!
//! 每次尝试前重新探测，不做持久化（下载可能在两次调用之间完成）。

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AvailabilityStatus {
    /// 运行环境不支持端侧推理
    Unsupported,
    /// 支持但当前不可用
    Unavailable,
    /// 模型可下载
    Downloadable,
    /// 正在下载，progress 取值 0.0 - 1.0
    Downloading { progress: Option<f32> },
    /// 可立即推理
    Ready,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsupported => "unsupported",
            Self::Unavailable => "unavailable",
            Self::Downloadable => "downloadable",
            Self::Downloading { .. } => "downloading",
            Self::Ready => "ready",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Downloading {
                progress: Some(p),
            } => write!(f, "downloading ({:.0}%)", p * 100.0),
            other => f.write_str(other.as_str()),
        }
    }
}
