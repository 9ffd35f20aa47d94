//! The append-only registration log.
//!
//! One line per active registration, in a fixed human-readable shape:
//!
//! ```text
//! User: <name>#<discriminator> (Discord ID: <id>) Whitelisted: <mcname> (UUID: <mcuuid>)
//! ```
//!
//! The log is the durable record of who has registered; the in-memory
//! verified-user index is rebuilt from it on startup. Lines are parsed into
//! structured records and matched on the numeric invoker id, so id `123`
//! never matches a line belonging to id `1234`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::{BotError, Result};

const USER_MARKER: &str = "User: ";
const ID_MARKER: &str = " (Discord ID: ";
const NAME_MARKER: &str = ") Whitelisted: ";
const UUID_MARKER: &str = " (UUID: ";

/// One registration, parsed from (or formatted into) a single log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    /// Discord `name#discriminator` tag of the invoker.
    pub invoker_tag: String,
    /// Discord snowflake of the invoker.
    pub invoker_id: u64,
    /// Minecraft account name as returned by the lookup service.
    pub minecraft_name: String,
    /// Minecraft account identifier.
    pub minecraft_uuid: String,
}

impl RegistrationRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{}{}{}{}{}{}{}{})",
            USER_MARKER,
            self.invoker_tag,
            ID_MARKER,
            self.invoker_id,
            NAME_MARKER,
            self.minecraft_name,
            UUID_MARKER,
            self.minecraft_uuid,
        )
    }

    /// Parse one log line. Returns `None` for lines that do not follow the
    /// record shape; callers keep such lines untouched on rewrite.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let rest = line.strip_prefix(USER_MARKER)?;

        let id_at = rest.find(ID_MARKER)?;
        let invoker_tag = &rest[..id_at];
        let rest = &rest[id_at + ID_MARKER.len()..];

        let name_at = rest.find(NAME_MARKER)?;
        let invoker_id: u64 = rest[..name_at].parse().ok()?;
        let rest = &rest[name_at + NAME_MARKER.len()..];

        let uuid_at = rest.find(UUID_MARKER)?;
        let minecraft_name = &rest[..uuid_at];
        let rest = &rest[uuid_at + UUID_MARKER.len()..];

        let minecraft_uuid = rest.strip_suffix(')')?;
        if invoker_tag.is_empty() || minecraft_name.is_empty() || minecraft_uuid.is_empty() {
            return None;
        }

        Some(Self {
            invoker_tag: invoker_tag.to_string(),
            invoker_id,
            minecraft_name: minecraft_name.to_string(),
            minecraft_uuid: minecraft_uuid.to_string(),
        })
    }
}

/// The registration log file on disk.
#[derive(Debug, Clone)]
pub struct RegistrationLog {
    path: PathBuf,
}

impl RegistrationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_lines(&self) -> Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(BotError::StorageLoad {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }

    /// Load every parseable record. Unparseable lines are skipped with a
    /// warning but stay in the file.
    pub async fn load(&self) -> Result<Vec<RegistrationRecord>> {
        let mut records = Vec::new();
        for line in self.read_lines().await? {
            match RegistrationRecord::parse(&line) {
                Some(record) => records.push(record),
                None => warn!(
                    "Skipping unparseable line in {}: {}",
                    self.path.display(),
                    line
                ),
            }
        }
        Ok(records)
    }

    /// Append one record as a new line, creating the file (and its parent
    /// directory) if needed.
    pub async fn append(&self, record: &RegistrationRecord) -> Result<()> {
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

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(|e| BotError::StorageSave {
                path: self.path.display().to_string(),
                source: e,
            })?;

        let line = format!("{}\n", record.to_line());
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| BotError::StorageSave {
                path: self.path.display().to_string(),
                source: e,
            })?;

        Ok(())
    }

    pub async fn contains(&self, invoker_id: u64) -> Result<bool> {
        Ok(self.find(invoker_id).await?.is_some())
    }

    pub async fn find(&self, invoker_id: u64) -> Result<Option<RegistrationRecord>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|r| r.invoker_id == invoker_id))
    }

    /// Rewrite the file keeping every line that does not belong to the given
    /// invoker. Unparseable lines are preserved verbatim.
    pub async fn remove(&self, invoker_id: u64) -> Result<()> {
        let kept: Vec<String> = self
            .read_lines()
            .await?
            .into_iter()
            .filter(|line| {
                RegistrationRecord::parse(line).map(|r| r.invoker_id) != Some(invoker_id)
            })
            .collect();

        let mut content = kept.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| BotError::StorageSave {
                path: self.path.display().to_string(),
                source: e,
            })
    }

    /// Collect the invoker ids of every record; used to rebuild the in-memory
    /// verified-user index at startup.
    pub async fn verified_ids(&self) -> Result<HashSet<u64>> {
        Ok(self.load().await?.into_iter().map(|r| r.invoker_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, name: &str) -> RegistrationRecord {
        RegistrationRecord {
            invoker_tag: format!("player{}#0001", id),
            invoker_id: id,
            minecraft_name: name.to_string(),
            minecraft_uuid: format!("uuid-{}", name),
        }
    }

    #[test]
    fn record_line_round_trips() {
        let original = RegistrationRecord {
            invoker_tag: "somebody#1234".to_string(),
            invoker_id: 123456789123456789,
            minecraft_name: "Notch".to_string(),
            minecraft_uuid: "069a79f4-44e9-4726-a5be-fca90e38aaf5".to_string(),
        };

        let line = original.to_line();
        assert_eq!(
            line,
            "User: somebody#1234 (Discord ID: 123456789123456789) \
             Whitelisted: Notch (UUID: 069a79f4-44e9-4726-a5be-fca90e38aaf5)"
        );
        assert_eq!(RegistrationRecord::parse(&line), Some(original));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(RegistrationRecord::parse(""), None);
        assert_eq!(RegistrationRecord::parse("some random line"), None);
        assert_eq!(
            RegistrationRecord::parse("User: x (Discord ID: not-a-number) Whitelisted: a (UUID: b)"),
            None
        );
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = RegistrationLog::new(dir.path().join("log.txt"));

        assert!(log.load().await.expect("load").is_empty());
        assert!(!log.contains(1).await.expect("contains"));
    }

    #[tokio::test]
    async fn append_then_find() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = RegistrationLog::new(dir.path().join("nested/log.txt"));

        log.append(&record(42, "Steve")).await.expect("append");

        let found = log.find(42).await.expect("find").expect("record");
        assert_eq!(found.minecraft_name, "Steve");
        assert!(log.contains(42).await.expect("contains"));
        assert!(!log.contains(43).await.expect("contains"));
    }

    #[tokio::test]
    async fn id_prefix_does_not_match_longer_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = RegistrationLog::new(dir.path().join("log.txt"));

        log.append(&record(1234, "Alex")).await.expect("append");

        assert!(!log.contains(123).await.expect("contains"));

        log.remove(123).await.expect("remove");
        assert!(log.contains(1234).await.expect("contains"));
    }

    #[tokio::test]
    async fn remove_keeps_other_records_and_unparseable_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = RegistrationLog::new(dir.path().join("log.txt"));

        log.append(&record(1, "Steve")).await.expect("append");
        log.append(&record(2, "Alex")).await.expect("append");

        // A hand-edited line that does not follow the record shape.
        let mut content = tokio::fs::read_to_string(log.path()).await.expect("read");
        content.push_str("operator note: migrated from old server\n");
        tokio::fs::write(log.path(), content).await.expect("write");

        log.remove(1).await.expect("remove");

        let remaining = tokio::fs::read_to_string(log.path()).await.expect("read");
        assert!(!remaining.contains("Steve"));
        assert!(remaining.contains("Alex"));
        assert!(remaining.contains("operator note"));
    }

    #[tokio::test]
    async fn verified_ids_collects_every_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = RegistrationLog::new(dir.path().join("log.txt"));

        log.append(&record(10, "a_player")).await.expect("append");
        log.append(&record(20, "b_player")).await.expect("append");

        let ids = log.verified_ids().await.expect("ids");
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&10));
        assert!(ids.contains(&20));
    }
}
