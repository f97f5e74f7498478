//! In-Memory Credential Store

use std::sync::{PoisonError, RwLock};

use crate::application::ports::CredentialStorePort;

/// 内存凭证存储（不落盘）
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    key: RwLock<Option<String>>,
}

impl InMemoryCredentialStore {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: RwLock::new(key),
        }
    }
}

impl CredentialStorePort for InMemoryCredentialStore {
    fn get_credential(&self) -> Option<String> {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
