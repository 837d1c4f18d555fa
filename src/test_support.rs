//! Recording doubles shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    notice::{ErrorSink, GuardFailure},
    ops::{OpsError, PrivilegedOps, ServiceStatus},
    settings::{SettingsPatch, SettingsView},
    store::{ConfigStore, StoreError},
};

/// Scriptable [`PrivilegedOps`] that counts every call.
pub(crate) struct RecordingOps {
    check: Mutex<Result<i32, String>>,
    install: Mutex<Result<(), String>>,
    grant: Mutex<Result<(), String>>,
    restart: Mutex<Result<(), String>>,
    delay: Mutex<Option<Duration>>,
    granted_core: Mutex<Option<String>>,
    pub check_calls: AtomicUsize,
    pub install_calls: AtomicUsize,
    pub grant_calls: AtomicUsize,
    pub restart_calls: AtomicUsize,
}

impl RecordingOps {
    pub fn new() -> Self {
        Self {
            check: Mutex::new(Ok(0)),
            install: Mutex::new(Ok(())),
            grant: Mutex::new(Ok(())),
            restart: Mutex::new(Ok(())),
            delay: Mutex::new(None),
            granted_core: Mutex::new(None),
            check_calls: AtomicUsize::new(0),
            install_calls: AtomicUsize::new(0),
            grant_calls: AtomicUsize::new(0),
            restart_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_check_code(&self, code: i32) {
        *self.check.lock().unwrap() = Ok(code);
    }

    pub fn fail_check(&self, message: &str) {
        *self.check.lock().unwrap() = Err(message.into());
    }

    pub fn fail_install(&self, message: &str) {
        *self.install.lock().unwrap() = Err(message.into());
    }

    pub fn unfail_install(&self) {
        *self.install.lock().unwrap() = Ok(());
    }

    pub fn fail_grant(&self, message: &str) {
        *self.grant.lock().unwrap() = Err(message.into());
    }

    pub fn fail_restart(&self, message: &str) {
        *self.restart.lock().unwrap() = Err(message.into());
    }

    /// Applied to every operation; combined with a paused tokio clock this
    /// simulates a hung privileged call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn granted_core(&self) -> Option<String> {
        self.granted_core.lock().unwrap().clone()
    }

    pub fn privileged_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
            + self.install_calls.load(Ordering::SeqCst)
            + self.grant_calls.load(Ordering::SeqCst)
            + self.restart_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn to_ops_error(result: Result<(), String>) -> Result<(), OpsError> {
    result.map_err(OpsError::Failed)
}

#[async_trait]
impl PrivilegedOps for RecordingOps {
    async fn check_service(&self) -> Result<ServiceStatus, OpsError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        match self.check.lock().unwrap().clone() {
            Ok(code) => Ok(ServiceStatus { code }),
            Err(message) => Err(OpsError::Failed(message)),
        }
    }

    async fn install_service(&self) -> Result<(), OpsError> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        to_ops_error(self.install.lock().unwrap().clone())
    }

    async fn grant_permission(&self, core_identity: &str) -> Result<(), OpsError> {
        self.grant_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        *self.granted_core.lock().unwrap() = Some(core_identity.into());
        to_ops_error(self.grant.lock().unwrap().clone())
    }

    async fn restart_helper(&self) -> Result<(), OpsError> {
        self.restart_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        to_ops_error(self.restart.lock().unwrap().clone())
    }
}

/// [`ConfigStore`] keeping successful patches in memory. Per-call outcomes
/// (and delays, for interleaving tests) can be scripted in advance; without
/// a script every patch succeeds immediately.
pub(crate) struct MemoryStore {
    pub patches: Mutex<Vec<SettingsPatch>>,
    pub patch_calls: AtomicUsize,
    script: Mutex<VecDeque<(Duration, Result<(), String>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            patches: Mutex::new(Vec::new()),
            patch_calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn fail_next(&self, message: &str) {
        self.enqueue(Duration::ZERO, Err(message.into()));
    }

    pub fn enqueue(&self, delay: Duration, result: Result<(), String>) {
        self.script.lock().unwrap().push_back((delay, result));
    }

    pub fn recorded(&self) -> Vec<SettingsPatch> {
        self.patches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load(&self) -> Result<SettingsView, StoreError> {
        Ok(SettingsView::default())
    }

    async fn patch_settings(&self, patch: &SettingsPatch) -> Result<(), StoreError> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, result) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((Duration::ZERO, Ok(())));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result.map_err(StoreError)?;
        self.patches.lock().unwrap().push(patch.clone());
        Ok(())
    }
}

/// Sink keeping the typed failures for assertion.
pub(crate) struct CollectingSink {
    failures: Mutex<Vec<GuardFailure>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn failures(&self) -> Vec<GuardFailure> {
        self.failures.lock().unwrap().clone()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, failure: GuardFailure) {
        self.failures.lock().unwrap().push(failure);
    }
}
