//! File Credential Store
//!
//! 以 TOML 文件保存单个 API key（`api_key = "..."`）。
//! 启动时加载一次，之后读取走内存缓存；save / clear 同时更新文件与缓存。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::CredentialStorePort;

/// 凭证存储错误
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("API key cannot be empty")]
    EmptyKey,

    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid credential file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize credential: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

/// 基于文件的凭证存储
pub struct FileCredentialStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileCredentialStore {
    /// 打开凭证文件，文件不存在时视为未保存
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let cached = Self::read_file(&path)?;
        tracing::debug!(
            path = %path.display(),
            stored = cached.is_some(),
            "Credential store opened"
        );
        Ok(Self {
            path,
            cached: RwLock::new(cached),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Result<Option<String>, CredentialError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let file: CredentialFile = toml::from_str(&content)?;
        Ok(file
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty()))
    }

    fn write_file(&self, file: &CredentialFile) -> Result<(), CredentialError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let content = toml::to_string_pretty(file)?;
        fs::write(&self.path, content)?;

        // 仅用户可读写
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    /// 保存 API key
    pub fn save(&self, key: &str) -> Result<(), CredentialError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }

        self.write_file(&CredentialFile {
            api_key: Some(key.to_string()),
        })?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(key.to_string());

        tracing::info!(path = %self.path.display(), key = %mask_key(key), "API key saved");
        Ok(())
    }

    /// 删除已保存的 API key
    pub fn clear(&self) -> Result<(), CredentialError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;

        tracing::info!(path = %self.path.display(), "API key cleared");
        Ok(())
    }
}

impl CredentialStorePort for FileCredentialStore {
    fn get_credential(&self) -> Option<String> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// 日志用的 key 掩码：保留首尾 4 个字符
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
