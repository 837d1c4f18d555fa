use std::sync::Mutex;

use thiserror::Error;

use crate::settings::SettingField;

#[derive(Debug, Clone, Error)]
pub enum GuardError {
    #[error("failed to persist settings: {0}")]
    Persistence(String),
    #[error("privilege escalation failed: {0}")]
    Escalation(String),
    #[error("service status query failed: {0}")]
    ServiceQuery(String),
}

/// A failed toggle attempt, as surfaced to the user. Every failure path
/// produces exactly one of these alongside the view rollback.
#[derive(Debug, Clone)]
pub struct GuardFailure {
    pub field: SettingField,
    pub reason: GuardError,
}

impl std::fmt::Display for GuardFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field.key(), self.reason)
    }
}

/// Caller-supplied sink for user-visible failures. The view layer typically
/// drains these into a notice toast or status line.
pub trait ErrorSink: Send + Sync {
    fn report(&self, failure: GuardFailure);
}

/// In-memory sink keeping rendered notices in arrival order.
#[derive(Default)]
pub struct NoticeLog {
    entries: Mutex<Vec<String>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.lock().unwrap())
    }
}

impl ErrorSink for NoticeLog {
    fn report(&self, failure: GuardFailure) {
        let message = failure.to_string();
        log::error!("[notice] {message}");
        self.entries.lock().unwrap().push(message);
    }
}
