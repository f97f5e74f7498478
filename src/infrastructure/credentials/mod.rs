//! Credentials - API key 持久化

mod file_store;

pub use file_store::{mask_key, CredentialError, FileCredentialStore};
