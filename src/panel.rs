use std::sync::Arc;

use crate::{
    escalation::EscalationFlow,
    guard::{GuardedToggle, RequestStatus, ToggleRequest},
    notice::ErrorSink,
    ops::{PrivilegedOps, ServiceChecker},
    platform::Platform,
    settings::{SettingField, SettingsPatch, SettingsView},
    store::{ConfigStore, SharedView, StoreError},
};

/// The "System Setting" section: five guarded toggles over one shared view.
///
/// All cross-field policy lives here, not in [`GuardedToggle`]: the Windows
/// tunnel/service pairing and the service-state gate on the service-mode
/// control are specific to this wiring.
pub struct SystemSettings {
    platform: Platform,
    view: SharedView,
    escalation: EscalationFlow,
    service: ServiceChecker,
    tunnel_mode: GuardedToggle,
    service_mode: GuardedToggle,
    system_proxy: GuardedToggle,
    auto_launch: GuardedToggle,
    silent_start: GuardedToggle,
}

impl SystemSettings {
    /// Loads the initial view from the store and wires the five toggles.
    pub async fn load(
        platform: Platform,
        store: Arc<dyn ConfigStore>,
        ops: Arc<dyn PrivilegedOps>,
        sink: Arc<dyn ErrorSink>,
    ) -> Result<Self, StoreError> {
        let view = store.load().await?;
        Ok(Self::new(platform, view, store, ops, sink))
    }

    pub fn new(
        platform: Platform,
        view: SettingsView,
        store: Arc<dyn ConfigStore>,
        ops: Arc<dyn PrivilegedOps>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        log::info!("[panel] system settings on {}", platform.label());
        let view = SharedView::new(view);
        let toggle = |field| {
            GuardedToggle::new(field, view.clone(), store.clone(), sink.clone())
        };

        Self {
            platform,
            escalation: EscalationFlow::new(platform, ops.clone(), sink.clone()),
            service: ServiceChecker::new(ops, sink.clone()),
            tunnel_mode: toggle(SettingField::TunnelMode),
            service_mode: toggle(SettingField::ServiceMode),
            system_proxy: toggle(SettingField::SystemProxy),
            auto_launch: toggle(SettingField::AutoLaunch),
            silent_start: toggle(SettingField::SilentStart),
            view,
        }
    }

    pub fn view(&self) -> SettingsView {
        self.view.snapshot()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Tunnel mode needs privileged setup before it may turn on, and on
    /// Windows a successful enable commits service mode in the same patch.
    pub async fn toggle_tunnel_mode(&self, enable: bool) -> ToggleRequest {
        let commit = if enable && self.platform == Platform::Windows {
            SettingsPatch::single(SettingField::ServiceMode, true)
                .with(SettingField::TunnelMode, true)
        } else {
            SettingsPatch::single(SettingField::TunnelMode, enable)
        };

        let core_identity = self.view.proxy_core();
        let request = self
            .tunnel_mode
            .attempt_change(enable, Some((&self.escalation, &core_identity)), commit)
            .await;

        // A successful enable on the service platforms may just have
        // installed the service; let the gate pick that up.
        if request.status == RequestStatus::Committed
            && enable
            && !self.platform.uses_permission_grant()
        {
            self.service.invalidate();
        }
        request
    }

    /// Rejected (no view change, no patch) until a status query has seen the
    /// service active or installed.
    pub async fn toggle_service_mode(&self, enable: bool) -> Option<ToggleRequest> {
        if !self.service_mode_available().await {
            log::info!("[panel] service mode toggle rejected, service not available");
            return None;
        }
        Some(
            self.service_mode
                .attempt_change(
                    enable,
                    None,
                    SettingsPatch::single(SettingField::ServiceMode, enable),
                )
                .await,
        )
    }

    pub async fn toggle_system_proxy(&self, enable: bool) -> ToggleRequest {
        self.toggle_plain(&self.system_proxy, enable).await
    }

    pub async fn toggle_auto_launch(&self, enable: bool) -> ToggleRequest {
        self.toggle_plain(&self.auto_launch, enable).await
    }

    pub async fn toggle_silent_start(&self, enable: bool) -> ToggleRequest {
        self.toggle_plain(&self.silent_start, enable).await
    }

    /// Whether the service-mode control accepts interaction.
    pub async fn service_mode_available(&self) -> bool {
        self.service.current().await.allows_service_mode()
    }

    async fn toggle_plain(&self, toggle: &GuardedToggle, enable: bool) -> ToggleRequest {
        toggle
            .attempt_change(enable, None, SettingsPatch::single(toggle.field(), enable))
            .await
    }
}
