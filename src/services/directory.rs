//! Identity Directory: registration number → stable user id and display name.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::chat_types::DirectoryEntry;
use crate::error::{ChatError, Result};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn resolve_by_registration_number(&self, registration_number: &str)
        -> Result<DirectoryEntry>;

    /// Every student whose display name matches exactly. Names are not unique.
    async fn find_by_name(&self, name: &str) -> Result<Vec<DirectoryEntry>>;
}

/// Student roster kept in `{base}/students.json`.
pub struct StudentDirectory {
    entries: RwLock<HashMap<String, DirectoryEntry>>,
    path: PathBuf,
}

impl StudentDirectory {
    /// Load from disk or create empty.
    pub fn new(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join("students.json");
        let entries: HashMap<String, DirectoryEntry> = if path.exists() {
            let data = std::fs::read_to_string(&path)
                .map_err(|e| ChatError::Storage(format!("Read student directory: {}", e)))?;
            let list: Vec<DirectoryEntry> = serde_json::from_str(&data)
                .map_err(|e| ChatError::Storage(format!("Parse student directory: {}", e)))?;
            list.into_iter()
                .map(|e| (e.registration_number.clone(), e))
                .collect()
        } else {
            HashMap::new()
        };
        log::info!("Loaded {} students from {:?}", entries.len(), path);
        Ok(Self {
            entries: RwLock::new(entries),
            path,
        })
    }

    /// Register or replace a student, keyed by registration number.
    pub fn insert(&self, entry: DirectoryEntry) -> Result<()> {
        for (field, value) in [
            ("id", &entry.id),
            ("name", &entry.name),
            ("registrationNumber", &entry.registration_number),
        ] {
            if value.trim().is_empty() {
                return Err(ChatError::validation(field, "is required"));
            }
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ChatError::Storage("Student directory lock poisoned".to_string()))?;
        entries.insert(entry.registration_number.clone(), entry);
        persist(&self.path, &entries)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdentityDirectory for StudentDirectory {
    async fn resolve_by_registration_number(
        &self,
        registration_number: &str,
    ) -> Result<DirectoryEntry> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ChatError::Storage("Student directory lock poisoned".to_string()))?;
        entries.get(registration_number).cloned().ok_or_else(|| {
            ChatError::NotFound(format!(
                "no student with registration number {}",
                registration_number
            ))
        })
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<DirectoryEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ChatError::Storage("Student directory lock poisoned".to_string()))?;
        let mut found: Vec<DirectoryEntry> = entries
            .values()
            .filter(|e| e.name == name)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.registration_number.cmp(&b.registration_number));
        Ok(found)
    }
}

fn persist(path: &Path, entries: &HashMap<String, DirectoryEntry>) -> Result<()> {
    let mut list: Vec<&DirectoryEntry> = entries.values().collect();
    list.sort_by(|a, b| a.registration_number.cmp(&b.registration_number));
    let data = serde_json::to_string_pretty(&list)
        .map_err(|e| ChatError::Storage(format!("Serialize student directory: {}", e)))?;
    std::fs::write(path, data)
        .map_err(|e| ChatError::Storage(format!("Write student directory: {}", e)))
}
