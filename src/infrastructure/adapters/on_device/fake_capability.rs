//! Fake Capability - 用于测试的端侧能力
//!
//! 返回脚本化的可用性与固定文本，并统计会话的创建与释放次数

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::application::error::InferenceError;
use crate::application::ports::{OnDeviceCapabilityPort, SessionHandle, SessionOptions};
use crate::domain::{AvailabilityStatus, Prompt};

#[derive(Debug, Default)]
struct Counters {
    sessions_created: AtomicUsize,
    sessions_released: AtomicUsize,
    availability_checks: AtomicUsize,
    downloads: AtomicUsize,
}

/// Fake Capability
pub struct FakeCapability {
    status: RwLock<AvailabilityStatus>,
    reply: String,
    invoke_delay: Duration,
    user_activation: bool,
    sessions_available: bool,
    last_options: RwLock<Option<SessionOptions>>,
    counters: Arc<Counters>,
}

impl FakeCapability {
    /// 模型就绪，调用返回固定文本
    pub fn ready(reply: impl Into<String>) -> Self {
        let mut fake = Self::with_status(AvailabilityStatus::Ready);
        fake.reply = reply.into();
        fake
    }

    pub fn with_status(status: AvailabilityStatus) -> Self {
        Self {
            status: RwLock::new(status),
            reply: String::new(),
            invoke_delay: Duration::ZERO,
            user_activation: false,
            sessions_available: true,
            last_options: RwLock::new(None),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_invoke_delay(mut self, delay: Duration) -> Self {
        self.invoke_delay = delay;
        self
    }

    pub fn with_user_activation(mut self) -> Self {
        self.user_activation = true;
        self
    }

    /// create_session 返回 None
    pub fn without_sessions(mut self) -> Self {
        self.sessions_available = false;
        self
    }

    pub fn sessions_created(&self) -> usize {
        self.counters.sessions_created.load(Ordering::SeqCst)
    }

    pub fn sessions_released(&self) -> usize {
        self.counters.sessions_released.load(Ordering::SeqCst)
    }

    pub fn availability_checks(&self) -> usize {
        self.counters.availability_checks.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.counters.downloads.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<SessionOptions> {
        self.last_options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl OnDeviceCapabilityPort for FakeCapability {
    async fn probe_availability(&self) -> AvailabilityStatus {
        self.counters.availability_checks.fetch_add(1, Ordering::SeqCst);
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn user_activation(&self) -> bool {
        self.user_activation
    }

    async fn start_download(&self) -> Result<(), InferenceError> {
        self.counters.downloads.fetch_add(1, Ordering::SeqCst);
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = AvailabilityStatus::Ready;
        tracing::debug!("FakeCapability: download completed");
        Ok(())
    }

    async fn create_session(
        &self,
        options: &SessionOptions,
    ) -> Result<Option<Box<dyn SessionHandle>>, InferenceError> {
        *self
            .last_options
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(options.clone());

        if !self.sessions_available {
            return Ok(None);
        }

        self.counters.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(FakeSession {
            reply: self.reply.clone(),
            delay: self.invoke_delay,
            counters: Arc::clone(&self.counters),
            released: false,
        })))
    }
}

struct FakeSession {
    reply: String,
    delay: Duration,
    counters: Arc<Counters>,
    released: bool,
}

#[async_trait]
impl SessionHandle for FakeSession {
    async fn invoke(
        &mut self,
        _prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(InferenceError::Cancelled),
            _ = tokio::time::sleep(self.delay) => Ok(self.reply.clone()),
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.sessions_released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
