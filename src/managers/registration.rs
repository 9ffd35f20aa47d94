//! Registration decision logic.
//!
//! The Discord commands own the conversation (prompts, the follow-up wait,
//! progress edits); this manager owns everything else: the entry guards, the
//! username checks, and the grant/revoke sequences against the resolver,
//! the gateway, and the on-disk state.

use std::sync::Arc;

use crate::error::Result;
use crate::managers::gateway::WhitelistGateway;
use crate::managers::identity::{IdentityResolver, MinecraftProfile};
use crate::state::SharedVerifiedUsers;
use crate::storage::{RegistrationLog, RegistrationRecord, WhitelistEntry, WhitelistFile};

/// Minecraft account names are 3 to 16 characters.
const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 16;

/// Why a registration attempt was turned away before any external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationRefusal {
    /// Invoker is already in the verified index.
    AlreadyRegistered,
    /// Invoker has a record in the registration log.
    PreviouslyRegistered,
    /// Invoker's current display name is already whitelisted.
    DisplayNameListed,
}

/// The Discord user driving a registration.
#[derive(Debug, Clone)]
pub struct Invoker {
    pub id: u64,
    pub tag: String,
}

/// Trim the submitted name and enforce the length bounds.
pub fn normalize_username(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.len() < USERNAME_MIN_LEN || name.len() > USERNAME_MAX_LEN {
        return None;
    }
    Some(name.to_string())
}

pub struct RegistrationManager {
    whitelist: WhitelistFile,
    log: RegistrationLog,
    verified: SharedVerifiedUsers,
    resolver: Arc<dyn IdentityResolver>,
    gateway: Arc<dyn WhitelistGateway>,
}

impl RegistrationManager {
    pub fn new(
        whitelist: WhitelistFile,
        log: RegistrationLog,
        verified: SharedVerifiedUsers,
        resolver: Arc<dyn IdentityResolver>,
        gateway: Arc<dyn WhitelistGateway>,
    ) -> Self {
        Self {
            whitelist,
            log,
            verified,
            resolver,
            gateway,
        }
    }

    /// Rebuild the verified-user index from the registration log. Called once
    /// at startup; returns how many ids were restored.
    pub async fn rebuild_verified_index(&self) -> Result<usize> {
        let ids = self.log.verified_ids().await?;
        let count = ids.len();
        self.verified.extend(ids);
        Ok(count)
    }

    /// Entry guards, in order; the first hit wins. The cheap in-memory check
    /// runs before anything touches disk.
    pub async fn check_registration(
        &self,
        invoker_id: u64,
        display_name: &str,
    ) -> Result<Option<RegistrationRefusal>> {
        if self.verified.contains(invoker_id) {
            return Ok(Some(RegistrationRefusal::AlreadyRegistered));
        }
        if self.log.contains(invoker_id).await? {
            return Ok(Some(RegistrationRefusal::PreviouslyRegistered));
        }
        if self.whitelist.contains_name(display_name).await? {
            return Ok(Some(RegistrationRefusal::DisplayNameListed));
        }
        Ok(None)
    }

    /// Fresh collision check against the whitelist file; the file can change
    /// while a registration waits for the invoker's reply.
    pub async fn is_name_listed(&self, name: &str) -> Result<bool> {
        self.whitelist.contains_name(name).await
    }

    pub async fn resolve(&self, username: &str) -> Option<MinecraftProfile> {
        self.resolver.resolve(username).await
    }

    /// Grant the whitelist slot. On gateway success this appends one log
    /// record, mirrors the entry into the whitelist file, and marks the
    /// invoker verified; on gateway failure nothing is persisted.
    pub async fn register(&self, invoker: &Invoker, profile: &MinecraftProfile) -> Result<bool> {
        if !self.gateway.grant(&profile.name).await {
            return Ok(false);
        }

        let record = RegistrationRecord {
            invoker_tag: invoker.tag.clone(),
            invoker_id: invoker.id,
            minecraft_name: profile.name.clone(),
            minecraft_uuid: profile.uuid.clone(),
        };
        self.log.append(&record).await?;

        let mut entries = self.whitelist.load().await?;
        entries.push(WhitelistEntry {
            name: profile.name.clone(),
            uuid: profile.uuid.clone(),
        });
        self.whitelist.save(&entries).await?;

        self.verified.insert(invoker.id);
        Ok(true)
    }

    pub async fn record_for(&self, invoker_id: u64) -> Result<Option<RegistrationRecord>> {
        self.log.find(invoker_id).await
    }

    /// Revoke the whitelist slot. On gateway success the log record and the
    /// verified-index entry go away so the invoker can register again; on
    /// failure everything stays, preserving retryability.
    ///
    /// The whitelist file keeps its entry either way: the game server's own
    /// whitelist is authoritative once `whitelist remove` has run.
    pub async fn unregister(&self, record: &RegistrationRecord) -> Result<bool> {
        if !self.gateway.revoke(&record.minecraft_name).await {
            return Ok(false);
        }

        self.log.remove(record.invoker_id).await?;
        self.verified.remove(record.invoker_id);
        Ok(true)
    }

    /// Every current whitelist entry, for the listing command.
    pub async fn entries(&self) -> Result<Vec<WhitelistEntry>> {
        self.whitelist.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::state::{create_shared_verified_users, VerifiedUsers};

    struct StubResolver {
        profile: Option<MinecraftProfile>,
        calls: AtomicUsize,
    }

    impl StubResolver {
        fn returning(profile: Option<MinecraftProfile>) -> Arc<Self> {
            Arc::new(Self {
                profile,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl IdentityResolver for StubResolver {
        async fn resolve(&self, _username: &str) -> Option<MinecraftProfile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.profile.clone()
        }
    }

    struct StubGateway {
        grant_ok: bool,
        revoke_ok: bool,
        grants: AtomicUsize,
        revokes: AtomicUsize,
    }

    impl StubGateway {
        fn scripted(grant_ok: bool, revoke_ok: bool) -> Arc<Self> {
            Arc::new(Self {
                grant_ok,
                revoke_ok,
                grants: AtomicUsize::new(0),
                revokes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl WhitelistGateway for StubGateway {
        async fn grant(&self, _username: &str) -> bool {
            self.grants.fetch_add(1, Ordering::SeqCst);
            self.grant_ok
        }

        async fn revoke(&self, _username: &str) -> bool {
            self.revokes.fetch_add(1, Ordering::SeqCst);
            self.revoke_ok
        }
    }

    fn notch() -> MinecraftProfile {
        MinecraftProfile {
            name: "Notch".to_string(),
            uuid: "069a79f444e94726a5befca90e38aaf5".to_string(),
        }
    }

    fn invoker(id: u64) -> Invoker {
        Invoker {
            id,
            tag: format!("player{}#0001", id),
        }
    }

    fn manager(
        dir: &TempDir,
        resolver: Arc<StubResolver>,
        gateway: Arc<StubGateway>,
    ) -> RegistrationManager {
        RegistrationManager::new(
            WhitelistFile::new(dir.path().join("whitelist.json")),
            RegistrationLog::new(dir.path().join("log.txt")),
            create_shared_verified_users(VerifiedUsers::new()),
            resolver,
            gateway,
        )
    }

    #[test]
    fn username_normalization_trims_and_bounds() {
        assert_eq!(normalize_username("  Notch  "), Some("Notch".to_string()));
        assert_eq!(normalize_username("abc"), Some("abc".to_string()));
        assert_eq!(normalize_username("a234567890123456"), Some("a234567890123456".to_string()));

        assert_eq!(normalize_username("ab"), None);
        assert_eq!(normalize_username("   "), None);
        assert_eq!(normalize_username("a2345678901234567"), None);
    }

    #[tokio::test]
    async fn successful_registration_persists_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = StubResolver::returning(Some(notch()));
        let gateway = StubGateway::scripted(true, true);
        let manager = manager(&dir, resolver.clone(), gateway.clone());

        assert_eq!(
            manager.check_registration(1, "somebody").await.expect("check"),
            None
        );

        let profile = manager.resolve("Notch").await.expect("profile");
        assert!(manager.register(&invoker(1), &profile).await.expect("register"));

        assert_eq!(gateway.grants.load(Ordering::SeqCst), 1);
        assert!(manager.verified.contains(1));

        let record = manager.record_for(1).await.expect("find").expect("record");
        assert_eq!(record.minecraft_name, "Notch");

        let entries = manager.entries().await.expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Notch");
        assert_eq!(entries[0].uuid, "069a79f444e94726a5befca90e38aaf5");
    }

    #[tokio::test]
    async fn repeat_invoker_is_refused_without_another_lookup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = StubResolver::returning(Some(notch()));
        let gateway = StubGateway::scripted(true, true);
        let manager = manager(&dir, resolver.clone(), gateway.clone());

        let profile = manager.resolve("Notch").await.expect("profile");
        manager.register(&invoker(1), &profile).await.expect("register");

        assert_eq!(
            manager.check_registration(1, "somebody").await.expect("check"),
            Some(RegistrationRefusal::AlreadyRegistered)
        );
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.grants.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn log_record_blocks_registration_without_the_index() {
        let dir = tempfile::tempdir().expect("tempdir");

        // A record left behind by an earlier process lifetime.
        let log = RegistrationLog::new(dir.path().join("log.txt"));
        log.append(&RegistrationRecord {
            invoker_tag: "player1#0001".to_string(),
            invoker_id: 1,
            minecraft_name: "Notch".to_string(),
            minecraft_uuid: "uuid".to_string(),
        })
        .await
        .expect("append");

        let manager = manager(
            &dir,
            StubResolver::returning(Some(notch())),
            StubGateway::scripted(true, true),
        );

        assert_eq!(
            manager.check_registration(1, "somebody").await.expect("check"),
            Some(RegistrationRefusal::PreviouslyRegistered)
        );
    }

    #[tokio::test]
    async fn rebuild_restores_index_from_log() {
        let dir = tempfile::tempdir().expect("tempdir");

        let log = RegistrationLog::new(dir.path().join("log.txt"));
        for id in [1u64, 2, 3] {
            log.append(&RegistrationRecord {
                invoker_tag: format!("player{}#0001", id),
                invoker_id: id,
                minecraft_name: format!("player{}", id),
                minecraft_uuid: format!("uuid-{}", id),
            })
            .await
            .expect("append");
        }

        let manager = manager(
            &dir,
            StubResolver::returning(None),
            StubGateway::scripted(true, true),
        );
        let restored = manager.rebuild_verified_index().await.expect("rebuild");

        assert_eq!(restored, 3);
        assert_eq!(
            manager.check_registration(2, "somebody").await.expect("check"),
            Some(RegistrationRefusal::AlreadyRegistered)
        );
    }

    #[tokio::test]
    async fn display_name_collision_is_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let whitelist = WhitelistFile::new(dir.path().join("whitelist.json"));
        whitelist
            .save(&[WhitelistEntry {
                name: "Steve".to_string(),
                uuid: "uuid-steve".to_string(),
            }])
            .await
            .expect("save");

        let manager = manager(
            &dir,
            StubResolver::returning(None),
            StubGateway::scripted(true, true),
        );

        assert_eq!(
            manager.check_registration(1, "STEVE").await.expect("check"),
            Some(RegistrationRefusal::DisplayNameListed)
        );
    }

    #[tokio::test]
    async fn failed_grant_persists_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gateway = StubGateway::scripted(false, true);
        let manager = manager(&dir, StubResolver::returning(Some(notch())), gateway.clone());

        assert!(!manager.register(&invoker(1), &notch()).await.expect("register"));

        assert!(!manager.verified.contains(1));
        assert!(manager.record_for(1).await.expect("find").is_none());
        assert!(manager.entries().await.expect("entries").is_empty());
    }

    #[tokio::test]
    async fn removal_deletes_record_but_keeps_whitelist_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gateway = StubGateway::scripted(true, true);
        let manager = manager(&dir, StubResolver::returning(Some(notch())), gateway.clone());

        manager.register(&invoker(1), &notch()).await.expect("register");

        let record = manager.record_for(1).await.expect("find").expect("record");
        assert!(manager.unregister(&record).await.expect("unregister"));

        assert_eq!(gateway.revokes.load(Ordering::SeqCst), 1);
        assert!(!manager.verified.contains(1));
        assert!(manager.record_for(1).await.expect("find").is_none());
        // The JSON mirror intentionally keeps the entry.
        assert_eq!(manager.entries().await.expect("entries").len(), 1);
    }

    #[tokio::test]
    async fn failed_revoke_leaves_the_record_in_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gateway = StubGateway::scripted(true, false);
        let manager = manager(&dir, StubResolver::returning(Some(notch())), gateway.clone());

        manager.register(&invoker(1), &notch()).await.expect("register");

        let record = manager.record_for(1).await.expect("find").expect("record");
        assert!(!manager.unregister(&record).await.expect("unregister"));

        assert!(manager.verified.contains(1));
        assert!(manager.record_for(1).await.expect("find").is_some());
    }
}
