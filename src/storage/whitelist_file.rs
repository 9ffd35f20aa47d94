use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{BotError, Result};

/// One whitelisted player, as stored in the JSON whitelist file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub name: String,
    pub uuid: String,
}

/// The JSON whitelist file on disk.
///
/// The whole array is rewritten on every mutation; there is no locking, so
/// concurrent writers are last-writer-wins.
#[derive(Debug, Clone)]
pub struct WhitelistFile {
    path: PathBuf,
}

impl WhitelistFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load all entries. A missing file is an empty whitelist, never an error.
    pub async fn load(&self) -> Result<Vec<WhitelistEntry>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| BotError::StorageParse {
                    path: self.path.display().to_string(),
                    source: e,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(BotError::StorageLoad {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }

    /// Save all entries, pretty-printed. Writes to a temp file first, then
    /// renames over the target.
    pub async fn save(&self, entries: &[WhitelistEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    BotError::StorageSave {
                        path: self.path.display().to_string(),
                        source: e,
                    }
                })?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StorageSave {
                path: self.path.display().to_string(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| BotError::StorageSave {
                path: self.path.display().to_string(),
                source: e,
            })?;

        Ok(())
    }

    /// Whether a name is already whitelisted, ignoring case.
    pub async fn contains_name(&self, name: &str) -> Result<bool> {
        Ok(Self::name_listed(&self.load().await?, name))
    }

    pub fn name_listed(entries: &[WhitelistEntry], name: &str) -> bool {
        entries.iter().any(|e| e.name.eq_ignore_ascii_case(name))
    }
}
