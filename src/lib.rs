//! Settings slice of the TunnelDeck proxy client: five mutually-dependent
//! boolean system settings behind a guarded optimistic-mutation protocol.
//!
//! Toggling a setting renders the requested value immediately, runs whatever
//! privileged setup the field needs (service install, permission grant),
//! persists on success and rolls the view back with a user-visible notice on
//! failure. The view layer binds to [`panel::SystemSettings`].

pub mod escalation;
pub mod guard;
pub mod notice;
pub mod ops;
pub mod panel;
pub mod platform;
pub mod settings;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use escalation::EscalationFlow;
pub use guard::{GuardedToggle, RequestStatus, ToggleRequest};
pub use notice::{ErrorSink, GuardError, GuardFailure, NoticeLog};
pub use ops::{OpsError, PrivilegedOps, ServiceChecker, ServiceState, ServiceStatus};
pub use panel::SystemSettings;
pub use platform::Platform;
pub use settings::{SettingField, SettingsPatch, SettingsView};
pub use store::{ConfigStore, FileStore, SharedView, StoreError};
