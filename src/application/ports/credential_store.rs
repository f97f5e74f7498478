//! Credential Store Port - API 密钥读取
//!
//! 编排核心只读取凭证，从不写入；写入由外层（命令行等）通过具体适配器完成。

/// Credential Store Port
pub trait CredentialStorePort: Send + Sync {
    /// 读取已保存的 API key
    fn get_credential(&self) -> Option<String>;
}
