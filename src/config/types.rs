//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::orchestrator::OrchestratorOptions;
use crate::infrastructure::adapters::{GeminiClientConfig, LocalRuntimeConfig};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 云端执行器配置
    #[serde(default)]
    pub cloud: CloudConfig,

    /// 端侧执行器配置
    #[serde(default)]
    pub on_device: OnDeviceConfig,

    /// 凭证配置
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// 图片输入配置
    #[serde(default)]
    pub image: ImageConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// 编排器参数
    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            on_device_timeout: Duration::from_millis(self.on_device.timeout_ms),
            background_download: self.on_device.background_download,
            ..OrchestratorOptions::default()
        }
    }
}

/// 云端配置
#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    /// API 基础 URL
    #[serde(default = "default_cloud_endpoint")]
    pub endpoint: String,

    /// 模型名
    #[serde(default = "default_cloud_model")]
    pub model: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_cloud_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_cloud_temperature")]
    pub temperature: f32,
}

fn default_cloud_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_cloud_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_cloud_timeout() -> u64 {
    60
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_cloud_temperature() -> f32 {
    0.4
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: default_cloud_endpoint(),
            model: default_cloud_model(),
            timeout_secs: default_cloud_timeout(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_cloud_temperature(),
        }
    }
}

impl CloudConfig {
    pub fn client_config(&self) -> GeminiClientConfig {
        GeminiClientConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            timeout_secs: self.timeout_secs,
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }
}

/// 端侧配置
#[derive(Debug, Clone, Deserialize)]
pub struct OnDeviceConfig {
    /// 是否尝试端侧；关闭后只走云端
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 本机运行时 URL
    #[serde(default = "default_on_device_endpoint")]
    pub endpoint: String,

    /// 本机模型名
    #[serde(default = "default_on_device_model")]
    pub model: String,

    /// 端侧等待上限（毫秒）
    #[serde(default = "default_on_device_timeout")]
    pub timeout_ms: u64,

    /// 模型可下载时是否后台下载
    #[serde(default = "default_true")]
    pub background_download: bool,

    /// 是否允许触发模型下载（相当于用户激活）
    #[serde(default)]
    pub allow_download: bool,

    #[serde(default = "default_on_device_temperature")]
    pub temperature: f32,
}

fn default_true() -> bool {
    true
}

fn default_on_device_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_on_device_model() -> String {
    "gemma3:4b".to_string()
}

fn default_on_device_timeout() -> u64 {
    5000
}

fn default_on_device_temperature() -> f32 {
    0.2
}

impl Default for OnDeviceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_on_device_endpoint(),
            model: default_on_device_model(),
            timeout_ms: default_on_device_timeout(),
            background_download: true,
            allow_download: false,
            temperature: default_on_device_temperature(),
        }
    }
}

impl OnDeviceConfig {
    pub fn runtime_config(&self) -> LocalRuntimeConfig {
        LocalRuntimeConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            allow_download: self.allow_download,
            ..LocalRuntimeConfig::default()
        }
    }
}

/// 凭证配置
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    /// 凭证文件路径
    #[serde(default = "default_credentials_path")]
    pub path: PathBuf,

    /// 直接提供的 API key（通常来自环境变量），设置后不读写凭证文件
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("data/credentials.toml")
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: default_credentials_path(),
            api_key: None,
        }
    }
}

/// 图片输入配置
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    /// 单张图片最大字节数，默认 20MB
    #[serde(default = "default_max_image_bytes")]
    pub max_bytes: u64,
}

fn default_max_image_bytes() -> u64 {
    20 * 1024 * 1024
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_image_bytes(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cloud.model, "gemini-2.0-flash");
        assert_eq!(config.on_device.endpoint, "http://127.0.0.1:11434");
        assert_eq!(config.on_device.timeout_ms, 5000);
        assert!(!config.on_device.allow_download);
        assert_eq!(config.image.max_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn test_orchestrator_options() {
        let mut config = AppConfig::default();
        config.on_device.timeout_ms = 1500;
        config.on_device.background_download = false;

        let options = config.orchestrator_options();
        assert_eq!(options.on_device_timeout, Duration::from_millis(1500));
        assert!(!options.background_download);
    }

    #[test]
    fn test_runtime_config_carries_activation() {
        let mut config = OnDeviceConfig::default();
        config.allow_download = true;
        assert!(config.runtime_config().allow_download);
    }
}
