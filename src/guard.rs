use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{
    escalation::EscalationFlow,
    notice::{ErrorSink, GuardError, GuardFailure},
    settings::{SettingField, SettingsPatch},
    store::{ConfigStore, SharedView},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Committed,
    RolledBack,
}

/// One attempt to change one field. `previous` is the rendered value at the
/// moment the request was accepted and is the rollback target.
#[derive(Clone, Copy, Debug)]
pub struct ToggleRequest {
    pub field: SettingField,
    pub previous: bool,
    pub requested: bool,
    pub status: RequestStatus,
}

/// Optimistic-apply / guard / rollback wrapper around one boolean setting.
///
/// The requested value is rendered into the shared view before any guard
/// work runs; if the guard or the store rejects the change, the view reverts
/// to the pre-request value and the error sink is informed. A per-field
/// generation counter makes overlapping requests on the same field safe: a
/// request that was superseded neither rolls back nor re-renders its own
/// field, so the newest accepted request always owns the view. Fields a
/// paired commit carries for other toggles are rendered even when stale;
/// the store accepted them and no other request owns them.
pub struct GuardedToggle {
    field: SettingField,
    view: SharedView,
    store: Arc<dyn ConfigStore>,
    sink: Arc<dyn ErrorSink>,
    generation: AtomicU64,
}

impl GuardedToggle {
    pub fn new(
        field: SettingField,
        view: SharedView,
        store: Arc<dyn ConfigStore>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            field,
            view,
            store,
            sink,
            generation: AtomicU64::new(0),
        }
    }

    pub fn field(&self) -> SettingField {
        self.field
    }

    /// `escalation` is the flow plus the proxy-core identity to grant for;
    /// the wiring passes it only for fields that need privileged setup.
    /// `commit` is what gets persisted and rendered on success — for a plain
    /// field just `{field: requested}`, for tunnel mode on Windows the
    /// paired two-field patch.
    pub async fn attempt_change(
        &self,
        requested: bool,
        escalation: Option<(&EscalationFlow, &str)>,
        commit: SettingsPatch,
    ) -> ToggleRequest {
        let previous = self.view.get(self.field);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut request = ToggleRequest {
            field: self.field,
            previous,
            requested,
            status: RequestStatus::Pending,
        };

        // Optimistic apply: pure and synchronous, never fails.
        self.view.set(self.field, requested);
        log::debug!(
            "[guard] {}: {previous} -> {requested} (generation {generation})",
            self.field.key()
        );

        // Disabling a privileged feature never requires privilege.
        if requested
            && let Some((flow, core_identity)) = escalation
            && !flow.escalate(self.field, core_identity).await
        {
            // The flow already reported the failure to the sink.
            self.roll_back(&mut request, generation, None);
            return request;
        }

        match self.store.patch_settings(&commit).await {
            Ok(()) => {
                log::info!("[guard] {}: committed {}", self.field.key(), commit.describe());
                if self.generation.load(Ordering::SeqCst) == generation {
                    self.view.mutate(&commit);
                } else {
                    log::debug!(
                        "[guard] {}: superseded, leaving the field to the newer request",
                        self.field.key()
                    );
                    // Paired fields were persisted and belong to no newer
                    // request, so they still render.
                    let paired = commit.without(self.field);
                    if !paired.is_empty() {
                        self.view.mutate(&paired);
                    }
                }
                request.status = RequestStatus::Committed;
            }
            Err(error) => {
                self.roll_back(
                    &mut request,
                    generation,
                    Some(GuardError::Persistence(error.to_string())),
                );
            }
        }
        request
    }

    fn roll_back(&self, request: &mut ToggleRequest, generation: u64, reason: Option<GuardError>) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.view.set(self.field, request.previous);
            log::info!(
                "[guard] {}: rolled back to {}",
                self.field.key(),
                request.previous
            );
        } else {
            log::debug!(
                "[guard] {}: stale rollback discarded, a newer request owns the view",
                self.field.key()
            );
        }
        if let Some(reason) = reason {
            self.sink.report(GuardFailure {
                field: self.field,
                reason,
            });
        }
        request.status = RequestStatus::RolledBack;
    }
}
