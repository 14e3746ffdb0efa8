use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::form::ProjectForm;

/// Storage key of the unsent project form.
pub const DRAFT_KEY: &str = "projectForm";

/// File name of the key-value store inside the client data directory.
pub const STORAGE_FILE: &str = "local_storage.json";

/// A small string key-value store persisted as one JSON object on disk.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Storage backed by `STORAGE_FILE` in `dir`. Nothing is created until
    /// the first write.
    pub fn open(dir: &Path) -> Self {
        Self {
            path: dir.join(STORAGE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // An unreadable file is replaced rather than blocking every write.
        let mut items = self.read_all().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable local storage");
            BTreeMap::new()
        });
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut items = self.read_all().unwrap_or_default();
        items.remove(key);
        self.write_all(&items)
    }
}

/// The project form as last edited, kept across runs until it is submitted
/// or reset.
#[derive(Debug, Clone)]
pub struct DraftStore {
    storage: LocalStorage,
}

impl DraftStore {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// The saved draft; `None` when there is none or it cannot be read.
    pub fn load(&self) -> Option<ProjectForm> {
        let raw = match self.storage.get_item(DRAFT_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read saved draft");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(form) => Some(form),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring corrupt saved draft");
                None
            }
        }
    }

    pub fn save(&self, form: &ProjectForm) -> Result<()> {
        let raw = serde_json::to_string(form).context("Failed to encode draft")?;
        self.storage.set_item(DRAFT_KEY, &raw)
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(DRAFT_KEY)
    }
}
