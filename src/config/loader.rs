//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（altlens.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;
use crate::infrastructure::credentials::mask_key;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["altlens", "altlens.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `ALTLENS_`，层级分隔符 `__`）
/// 2. 配置文件（altlens.toml 或 altlens.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `ALTLENS_CLOUD__MODEL=gemini-2.5-flash`
/// - `ALTLENS_ON_DEVICE__ENABLED=false`
/// - `ALTLENS_ON_DEVICE__TIMEOUT_MS=3000`
/// - `ALTLENS_CREDENTIALS__API_KEY=...`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("cloud.endpoint", "https://generativelanguage.googleapis.com/v1beta")?
        .set_default("cloud.model", "gemini-2.0-flash")?
        .set_default("cloud.timeout_secs", 60)?
        .set_default("cloud.max_output_tokens", 1024)?
        .set_default("cloud.temperature", 0.4)?
        .set_default("on_device.enabled", true)?
        .set_default("on_device.endpoint", "http://127.0.0.1:11434")?
        .set_default("on_device.model", "gemma3:4b")?
        .set_default("on_device.timeout_ms", 5000)?
        .set_default("on_device.background_download", true)?
        .set_default("on_device.allow_download", false)?
        .set_default("on_device.temperature", 0.2)?
        .set_default("credentials.path", "data/credentials.toml")?
        .set_default("image.max_bytes", 20 * 1024 * 1024)?
        .set_default("log.level", "warn")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: ALTLENS_ON_DEVICE__MODEL=llava:7b
    builder = builder.add_source(
        Environment::with_prefix("ALTLENS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.cloud.endpoint.is_empty() {
        return Err(ConfigError::ValidationError(
            "Cloud endpoint cannot be empty".to_string(),
        ));
    }

    if config.cloud.model.is_empty() {
        return Err(ConfigError::ValidationError(
            "Cloud model cannot be empty".to_string(),
        ));
    }

    if config.cloud.max_output_tokens == 0 {
        return Err(ConfigError::ValidationError(
            "cloud.max_output_tokens must be greater than 0".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&config.cloud.temperature)
        || !(0.0..=2.0).contains(&config.on_device.temperature)
    {
        return Err(ConfigError::ValidationError(
            "temperature must be between 0.0 and 2.0".to_string(),
        ));
    }

    if config.on_device.enabled {
        if config.on_device.endpoint.is_empty() || config.on_device.model.is_empty() {
            return Err(ConfigError::ValidationError(
                "On-device endpoint and model are required when on-device is enabled".to_string(),
            ));
        }
        if config.on_device.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "on_device.timeout_ms cannot be 0 when on-device is enabled".to_string(),
            ));
        }
    }

    if config.image.max_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "image.max_bytes cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Cloud Endpoint: {}", config.cloud.endpoint);
    tracing::info!("Cloud Model: {}", config.cloud.model);
    tracing::info!("Cloud Timeout: {}s", config.cloud.timeout_secs);
    tracing::info!("On-device Enabled: {}", config.on_device.enabled);
    if config.on_device.enabled {
        tracing::info!("On-device Endpoint: {}", config.on_device.endpoint);
        tracing::info!("On-device Model: {}", config.on_device.model);
        tracing::info!("On-device Timeout: {}ms", config.on_device.timeout_ms);
        tracing::info!("Background Download: {}", config.on_device.background_download);
        tracing::info!("Download Allowed: {}", config.on_device.allow_download);
    }
    match &config.credentials.api_key {
        Some(key) => tracing::info!("API Key: {} (from configuration)", mask_key(key)),
        None => tracing::info!("Credential File: {:?}", config.credentials.path),
    }
    tracing::info!("Max Image Size: {} bytes", config.image.max_bytes);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_timeout() {
        let mut config = AppConfig::default();
        config.on_device.timeout_ms = 0;
        assert!(validate_config(&config).is_err());

        config.on_device.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_cloud_model() {
        let mut config = AppConfig::default();
        config.cloud.model = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_temperature() {
        let mut config = AppConfig::default();
        config.cloud.temperature = 3.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[on_device]\nmodel = \"llava:7b\"\ntimeout_ms = 2500\n\n[cloud]\ntemperature = 0.1"
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();

        assert_eq!(config.on_device.model, "llava:7b");
        assert_eq!(config.on_device.timeout_ms, 2500);
        assert!((config.cloud.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.cloud.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_invalid_file_value_fails_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[image]\nmax_bytes = 0").unwrap();

        let err = load_config_from_path(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
