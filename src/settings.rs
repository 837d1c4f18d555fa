use serde::{Deserialize, Serialize};

/// One of the five boolean system settings managed by the guarded protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingField {
    TunnelMode,
    ServiceMode,
    SystemProxy,
    AutoLaunch,
    SilentStart,
}

impl SettingField {
    pub const ALL: [SettingField; 5] = [
        Self::TunnelMode,
        Self::ServiceMode,
        Self::SystemProxy,
        Self::AutoLaunch,
        Self::SilentStart,
    ];

    /// Stable key used in the persisted file and in log lines.
    pub fn key(self) -> &'static str {
        match self {
            Self::TunnelMode => "enable_tunnel_mode",
            Self::ServiceMode => "enable_service_mode",
            Self::SystemProxy => "enable_system_proxy",
            Self::AutoLaunch => "enable_auto_launch",
            Self::SilentStart => "enable_silent_start",
        }
    }

    /// Whether enabling this field needs a privileged setup step first.
    /// Disabling never does.
    pub fn requires_escalation(self) -> bool {
        matches!(self, Self::TunnelMode)
    }
}

/// Locally cached view of the settings, plus the proxy-core identity the
/// permission grant is issued for. Everything defaults off so an absent or
/// partial file is safe to load.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SettingsView {
    #[serde(default)]
    pub enable_tunnel_mode: bool,
    #[serde(default)]
    pub enable_service_mode: bool,
    #[serde(default)]
    pub enable_system_proxy: bool,
    #[serde(default)]
    pub enable_auto_launch: bool,
    #[serde(default)]
    pub enable_silent_start: bool,
    #[serde(default = "default_proxy_core")]
    pub proxy_core: String,
}

fn default_proxy_core() -> String {
    "tunneldeck-core".into()
}

impl Default for SettingsView {
    fn default() -> Self {
        Self {
            enable_tunnel_mode: false,
            enable_service_mode: false,
            enable_system_proxy: false,
            enable_auto_launch: false,
            enable_silent_start: false,
            proxy_core: default_proxy_core(),
        }
    }
}

impl SettingsView {
    pub fn get(&self, field: SettingField) -> bool {
        match field {
            SettingField::TunnelMode => self.enable_tunnel_mode,
            SettingField::ServiceMode => self.enable_service_mode,
            SettingField::SystemProxy => self.enable_system_proxy,
            SettingField::AutoLaunch => self.enable_auto_launch,
            SettingField::SilentStart => self.enable_silent_start,
        }
    }

    pub fn set(&mut self, field: SettingField, value: bool) {
        match field {
            SettingField::TunnelMode => self.enable_tunnel_mode = value,
            SettingField::ServiceMode => self.enable_service_mode = value,
            SettingField::SystemProxy => self.enable_system_proxy = value,
            SettingField::AutoLaunch => self.enable_auto_launch = value,
            SettingField::SilentStart => self.enable_silent_start = value,
        }
    }

    pub fn apply(&mut self, patch: &SettingsPatch) {
        for (field, value) in patch.fields() {
            self.set(field, value);
        }
    }
}

/// A partial write: only the touched fields cross the store boundary.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tunnel_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_service_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_system_proxy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_auto_launch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_silent_start: Option<bool>,
}

impl SettingsPatch {
    pub fn single(field: SettingField, value: bool) -> Self {
        Self::default().with(field, value)
    }

    pub fn with(mut self, field: SettingField, value: bool) -> Self {
        *self.slot_mut(field) = Some(value);
        self
    }

    pub fn without(mut self, field: SettingField) -> Self {
        *self.slot_mut(field) = None;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    pub fn get(&self, field: SettingField) -> Option<bool> {
        match field {
            SettingField::TunnelMode => self.enable_tunnel_mode,
            SettingField::ServiceMode => self.enable_service_mode,
            SettingField::SystemProxy => self.enable_system_proxy,
            SettingField::AutoLaunch => self.enable_auto_launch,
            SettingField::SilentStart => self.enable_silent_start,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (SettingField, bool)> + '_ {
        SettingField::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|value| (field, value)))
    }

    pub fn describe(&self) -> String {
        self.fields()
            .map(|(field, value)| format!("{}={}", field.key(), value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn slot_mut(&mut self, field: SettingField) -> &mut Option<bool> {
        match field {
            SettingField::TunnelMode => &mut self.enable_tunnel_mode,
            SettingField::ServiceMode => &mut self.enable_service_mode,
            SettingField::SystemProxy => &mut self.enable_system_proxy,
            SettingField::AutoLaunch => &mut self.enable_auto_launch,
            SettingField::SilentStart => &mut self.enable_silent_start,
        }
    }
}
