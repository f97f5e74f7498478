//! 应用层错误定义
//!
//! - InferenceError: 执行器与编排器共用的推理错误
//! - ApplicationError: 命令入口的校验错误

use serde::Serialize;
use thiserror::Error;

use crate::domain::moderation::VerdictError;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 缺少凭证等用户配置问题，需提示用户修复
    Configuration,
    /// 端侧能力不可用，总是在本地回退，不向用户展示
    CapabilityUnavailable,
    /// 超出等待上限
    Timeout,
    /// 网络或 HTTP 错误
    Transport,
    /// 响应结构不符合预期
    MalformedResponse,
    /// 因长度限制被截断且没有可用文本
    Truncated,
    /// 被新请求取代，直接丢弃
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::CapabilityUnavailable => "capability_unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transport => "transport",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Truncated => "truncated",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 推理错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("On-device capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Response truncated: {0}")]
    Truncated(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl InferenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Transport(_) => ErrorKind::Transport,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::Truncated(_) => ErrorKind::Truncated,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn missing_credential() -> Self {
        Self::Configuration(
            "no API key is stored; save a cloud API key to enable image descriptions and comment checks"
                .to_string(),
        )
    }

    /// 把 reqwest 错误映射为 Timeout / Transport
    ///
    /// 去掉 URL，避免 query 中的 API key 进入错误信息。
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.without_url().to_string())
        } else if err.is_connect() {
            Self::Transport(format!("cannot connect: {}", err.without_url()))
        } else {
            Self::Transport(err.without_url().to_string())
        }
    }
}

impl From<VerdictError> for InferenceError {
    fn from(err: VerdictError) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}
