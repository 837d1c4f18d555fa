use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

use crate::settings::{SettingField, SettingsPatch, SettingsView};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// The external configuration store. One patch call is atomic; nothing here
/// is transactional across calls.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self) -> Result<SettingsView, StoreError>;

    async fn patch_settings(&self, patch: &SettingsPatch) -> Result<(), StoreError>;
}

/// In-process cached view of the settings. This is what the view layer
/// renders from; mutating it never touches the store.
#[derive(Clone)]
pub struct SharedView {
    inner: Arc<Mutex<SettingsView>>,
}

impl SharedView {
    pub fn new(view: SettingsView) -> Self {
        Self {
            inner: Arc::new(Mutex::new(view)),
        }
    }

    pub fn get(&self, field: SettingField) -> bool {
        self.inner.lock().unwrap().get(field)
    }

    pub fn set(&self, field: SettingField, value: bool) {
        self.inner.lock().unwrap().set(field, value);
    }

    pub fn mutate(&self, patch: &SettingsPatch) {
        self.inner.lock().unwrap().apply(patch);
    }

    pub fn snapshot(&self) -> SettingsView {
        self.inner.lock().unwrap().clone()
    }

    pub fn proxy_core(&self) -> String {
        self.inner.lock().unwrap().proxy_core.clone()
    }
}

/// TOML file under the user configuration directory. Patches are
/// read-merge-write; a missing or unparsable file loads as defaults.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new() -> Self {
        Self {
            path: Self::settings_file_path(),
        }
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn settings_file_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tunneldeck")
            .join("settings.toml")
    }

    fn read_view(&self) -> SettingsView {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(view) => view,
                Err(error) => {
                    log::warn!(
                        "[store] failed to parse {}: {error}",
                        self.path.display()
                    );
                    SettingsView::default()
                }
            },
            Err(_) => {
                log::info!(
                    "[store] no settings file at {}, using defaults",
                    self.path.display()
                );
                SettingsView::default()
            }
        }
    }

    fn write_view(&self, view: &SettingsView) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && let Err(error) = std::fs::create_dir_all(parent)
        {
            return Err(StoreError(format!(
                "failed to create {}: {error}",
                parent.display()
            )));
        }

        let content = toml::to_string_pretty(view)
            .map_err(|error| StoreError(format!("failed to serialize settings: {error}")))?;
        std::fs::write(&self.path, content)
            .map_err(|error| StoreError(format!("failed to write {}: {error}", self.path.display())))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for FileStore {
    async fn load(&self) -> Result<SettingsView, StoreError> {
        Ok(self.read_view())
    }

    async fn patch_settings(&self, patch: &SettingsPatch) -> Result<(), StoreError> {
        let mut view = self.read_view();
        view.apply(patch);
        self.write_view(&view)?;
        log::debug!("[store] persisted {}", patch.describe());
        Ok(())
    }
}
