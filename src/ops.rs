use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    notice::{ErrorSink, GuardError, GuardFailure},
    settings::SettingField,
};

/// Raw result of a service-status query. The code is opaque apart from two
/// sentinels: 0 (running) and 400 (installed but not yet configured).
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct ServiceStatus {
    pub code: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    NotInstalled,
    Active,
    Installed,
    /// No status query has ever succeeded.
    Unknown,
}

impl ServiceStatus {
    pub fn state(self) -> ServiceState {
        match self.code {
            0 => ServiceState::Active,
            400 => ServiceState::Installed,
            _ => ServiceState::NotInstalled,
        }
    }
}

impl ServiceState {
    /// The service-mode control only accepts interaction in these states.
    pub fn allows_service_mode(self) -> bool {
        matches!(self, Self::Active | Self::Installed)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotInstalled => "not installed",
            Self::Active => "active",
            Self::Installed => "installed",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("{0}")]
    Failed(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Request/response contract to the privileged native side. Implementations
/// live outside this crate (IPC to the desktop shell, an elevated helper);
/// tests inject recording doubles.
#[async_trait]
pub trait PrivilegedOps: Send + Sync {
    async fn check_service(&self) -> Result<ServiceStatus, OpsError>;

    async fn install_service(&self) -> Result<(), OpsError>;

    async fn grant_permission(&self, core_identity: &str) -> Result<(), OpsError>;

    async fn restart_helper(&self) -> Result<(), OpsError>;
}

#[derive(Clone, Copy)]
struct CachedStatus {
    state: ServiceState,
    checked_at: Instant,
}

/// Throttled cache over [`PrivilegedOps::check_service`]. A failed query is
/// reported once to the sink, cached as `Unknown` and not retried until the
/// throttle elapses; a service install calls [`ServiceChecker::invalidate`]
/// to force a fresh query.
pub struct ServiceChecker {
    ops: Arc<dyn PrivilegedOps>,
    sink: Arc<dyn ErrorSink>,
    throttle: Duration,
    cached: Mutex<Option<CachedStatus>>,
}

impl ServiceChecker {
    pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(3600);

    pub fn new(ops: Arc<dyn PrivilegedOps>, sink: Arc<dyn ErrorSink>) -> Self {
        Self::with_throttle(ops, sink, Self::DEFAULT_THROTTLE)
    }

    pub fn with_throttle(
        ops: Arc<dyn PrivilegedOps>,
        sink: Arc<dyn ErrorSink>,
        throttle: Duration,
    ) -> Self {
        Self {
            ops,
            sink,
            throttle,
            cached: Mutex::new(None),
        }
    }

    pub async fn current(&self) -> ServiceState {
        if let Some(cached) = *self.cached.lock().unwrap()
            && cached.checked_at.elapsed() < self.throttle
        {
            return cached.state;
        }

        let state = match self.ops.check_service().await {
            Ok(status) => {
                log::info!(
                    "[service] status code {} ({})",
                    status.code,
                    status.state().label()
                );
                status.state()
            }
            Err(error) => {
                log::warn!("[service] status query failed: {error}");
                // The service-mode control stays gated; tell the user why.
                self.sink.report(GuardFailure {
                    field: SettingField::ServiceMode,
                    reason: GuardError::ServiceQuery(error.to_string()),
                });
                ServiceState::Unknown
            }
        };

        *self.cached.lock().unwrap() = Some(CachedStatus {
            state,
            checked_at: Instant::now(),
        });
        state
    }

    pub fn invalidate(&self) {
        *self.cached.lock().unwrap() = None;
    }
}
