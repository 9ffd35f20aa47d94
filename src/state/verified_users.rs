use dashmap::DashSet;
use std::sync::Arc;

/// In-memory index of invoker ids that have completed registration.
///
/// This is a shadow of the registration log, rebuilt from it on startup and
/// never persisted on its own. The log stays the source of truth; losing the
/// process only loses this cache.
#[derive(Debug, Default)]
pub struct VerifiedUsers {
    ids: DashSet<u64>,
}

impl VerifiedUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, invoker_id: u64) -> bool {
        self.ids.contains(&invoker_id)
    }

    /// Returns `true` if the id was not present yet.
    pub fn insert(&self, invoker_id: u64) -> bool {
        self.ids.insert(invoker_id)
    }

    /// Returns `true` if the id was present.
    pub fn remove(&self, invoker_id: u64) -> bool {
        self.ids.remove(&invoker_id).is_some()
    }

    pub fn extend(&self, invoker_ids: impl IntoIterator<Item = u64>) {
        for id in invoker_ids {
            self.ids.insert(id);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Shared verified-user index type
pub type SharedVerifiedUsers = Arc<VerifiedUsers>;

pub fn create_shared_verified_users(users: VerifiedUsers) -> SharedVerifiedUsers {
    Arc::new(users)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_contains_remove() {
        let users = VerifiedUsers::new();

        assert!(!users.contains(7));
        assert!(users.insert(7));
        assert!(!users.insert(7));
        assert!(users.contains(7));

        assert!(users.remove(7));
        assert!(!users.remove(7));
        assert!(!users.contains(7));
    }

    #[test]
    fn extend_populates_index() {
        let users = VerifiedUsers::new();
        users.extend([1, 2, 3]);

        assert_eq!(users.len(), 3);
        assert!(users.contains(2));
    }
}
