use std::{future::Future, sync::Arc, time::Duration};

use crate::{
    notice::{ErrorSink, GuardError, GuardFailure},
    ops::{OpsError, PrivilegedOps, ServiceState},
    platform::Platform,
    settings::SettingField,
};

/// One-shot privileged setup a field needs before its value may become
/// `true`. Linear, re-entrant, at most two privileged operations per call:
/// grant + helper restart on macOS/Linux, status check + install elsewhere.
pub struct EscalationFlow {
    platform: Platform,
    ops: Arc<dyn PrivilegedOps>,
    sink: Arc<dyn ErrorSink>,
    budget: Duration,
}

impl EscalationFlow {
    pub const DEFAULT_BUDGET: Duration = Duration::from_secs(30);

    pub fn new(platform: Platform, ops: Arc<dyn PrivilegedOps>, sink: Arc<dyn ErrorSink>) -> Self {
        Self::with_budget(platform, ops, sink, Self::DEFAULT_BUDGET)
    }

    pub fn with_budget(
        platform: Platform,
        ops: Arc<dyn PrivilegedOps>,
        sink: Arc<dyn ErrorSink>,
        budget: Duration,
    ) -> Self {
        Self {
            platform,
            ops,
            sink,
            budget,
        }
    }

    /// Returns `true` when the field is cleared to commit. Every failure is
    /// reported to the error sink before `false` comes back; no state is
    /// retained, so calling again restarts the sequence from scratch.
    pub async fn escalate(&self, field: SettingField, core_identity: &str) -> bool {
        log::info!(
            "[escalation] {} on {} (core={core_identity})",
            field.key(),
            self.platform.label()
        );

        if self.platform.uses_permission_grant() {
            self.escalate_via_grant(field, core_identity).await
        } else {
            self.escalate_via_service(field).await
        }
    }

    async fn escalate_via_grant(&self, field: SettingField, core_identity: &str) -> bool {
        if let Err(error) = self.bounded(self.ops.grant_permission(core_identity)).await {
            self.report(
                field,
                GuardError::Escalation(format!("permission grant for {core_identity}: {error}")),
            );
            return false;
        }

        // The helper restart is fire-and-forget: a grant that stuck is still
        // a success even if the restart does not come up.
        if let Err(error) = self.bounded(self.ops.restart_helper()).await {
            log::warn!("[escalation] helper restart after grant failed: {error}");
        }
        true
    }

    async fn escalate_via_service(&self, field: SettingField) -> bool {
        let install_needed = match self.bounded(self.ops.check_service()).await {
            Ok(status) => {
                let state = status.state();
                log::debug!(
                    "[escalation] service status code {} ({})",
                    status.code,
                    state.label()
                );
                !matches!(state, ServiceState::Active | ServiceState::Installed)
            }
            Err(error) => {
                // Structural query failure: assume not installed and fall
                // back to a single install attempt.
                log::warn!("[escalation] status query failed, assuming not installed: {error}");
                true
            }
        };

        if !install_needed {
            return true;
        }

        match self.bounded(self.ops.install_service()).await {
            Ok(()) => {
                log::info!("[escalation] service installed");
                true
            }
            Err(error) => {
                self.report(
                    field,
                    GuardError::Escalation(format!("service install: {error}")),
                );
                false
            }
        }
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, OpsError>>,
    ) -> Result<T, OpsError> {
        match tokio::time::timeout(self.budget, operation).await {
            Ok(result) => result,
            Err(_) => Err(OpsError::TimedOut(self.budget)),
        }
    }

    fn report(&self, field: SettingField, reason: GuardError) {
        log::warn!("[escalation] {}: {reason}", field.key());
        self.sink.report(GuardFailure { field, reason });
    }
}
