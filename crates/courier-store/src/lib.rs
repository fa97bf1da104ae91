use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use courier_types::models::{RegistryStats, StoredMessage, UserId, UserRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no user with id {0}")]
    NotFound(UserId),

    #[error("failed to write registry snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize registry snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The entire persisted state, serialized as one JSON document.
///
/// `operator_messages` is reserved for operator-message metadata. It is
/// currently unused but carried through load/store cycles untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    users: BTreeMap<UserId, UserRecord>,

    #[serde(default)]
    operator_messages: serde_json::Map<String, serde_json::Value>,
}

/// Durable store of all user records and their message timelines.
///
/// Every mutation rewrites the full snapshot under the write lock, so
/// concurrent mutations can never race on the on-disk file. The whole
/// registry living in one document is a deliberate scalability ceiling:
/// this is sized for a support inbox, not a public chat network.
pub struct Registry {
    path: PathBuf,
    inner: RwLock<Document>,
}

impl Registry {
    /// Open the registry at `path`. A missing snapshot starts empty; an
    /// unreadable or malformed one is logged and also starts empty — a bad
    /// file must never crash-loop the process.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = load_document(&path);

        info!(
            "Registry opened at {} ({} users)",
            path.display(),
            doc.users.len()
        );

        Self {
            path,
            inner: RwLock::new(doc),
        }
    }

    /// Create the record if absent; return the existing one unmodified
    /// otherwise. Only a creation touches the disk.
    pub async fn upsert_user(
        &self,
        id: UserId,
        display_name: Option<&str>,
        handle: Option<&str>,
    ) -> Result<UserRecord, StoreError> {
        let mut doc = self.inner.write().await;

        if let Some(existing) = doc.users.get(&id) {
            return Ok(existing.clone());
        }

        let record = UserRecord {
            id,
            display_name: display_name.map(str::to_owned),
            handle: handle.map(str::to_owned),
            joined_at: Utc::now(),
            is_active: true,
            messages: Vec::new(),
        };

        doc.users.insert(id, record.clone());
        write_snapshot(&self.path, &doc)?;

        Ok(record)
    }

    pub async fn get_user(&self, id: UserId) -> Option<UserRecord> {
        self.inner.read().await.users.get(&id).cloned()
    }

    /// Append to the user's timeline with the current timestamp. The engine
    /// is responsible for upserting first; an unknown id is a caller error.
    pub async fn append_message(
        &self,
        id: UserId,
        text: &str,
        from_operator: bool,
    ) -> Result<StoredMessage, StoreError> {
        let mut doc = self.inner.write().await;

        let user = doc.users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let message = StoredMessage {
            text: text.to_owned(),
            timestamp: Utc::now(),
            from_operator,
        };
        user.messages.push(message.clone());

        write_snapshot(&self.path, &doc)?;

        Ok(message)
    }

    /// All active users in creation order (join time, id as tiebreaker).
    pub async fn list_active_users(&self) -> Vec<UserRecord> {
        let doc = self.inner.read().await;
        let mut users: Vec<UserRecord> =
            doc.users.values().filter(|u| u.is_active).cloned().collect();
        users.sort_by_key(|u| (u.joined_at, u.id));
        users
    }

    /// Active users ranked by most recent activity (latest message, or join
    /// time for quiet users), most recent first, truncated to `limit`.
    pub async fn recent_active_users(&self, limit: usize) -> Vec<UserRecord> {
        let doc = self.inner.read().await;
        let mut users: Vec<UserRecord> =
            doc.users.values().filter(|u| u.is_active).cloned().collect();
        users.sort_by_key(|u| std::cmp::Reverse((u.last_activity(), u.id)));
        users.truncate(limit);
        users
    }

    /// Toggle `is_active`. Setting the current value again still succeeds
    /// and still persists — idempotent but observable.
    pub async fn set_active(&self, id: UserId, value: bool) -> Result<(), StoreError> {
        let mut doc = self.inner.write().await;

        let user = doc.users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        user.is_active = value;

        write_snapshot(&self.path, &doc)?;

        Ok(())
    }

    /// Totals over active users only, matching what the operator sees in
    /// listings. Average is 0 when there are no active users.
    pub async fn stats(&self) -> RegistryStats {
        let doc = self.inner.read().await;

        let active: Vec<&UserRecord> = doc.users.values().filter(|u| u.is_active).collect();
        let total_users = active.len();
        let total_messages: usize = active.iter().map(|u| u.messages.len()).sum();
        let average_messages = if total_users > 0 {
            total_messages as f64 / total_users as f64
        } else {
            0.0
        };

        RegistryStats {
            total_users,
            total_messages,
            average_messages,
        }
    }
}

fn load_document(path: &Path) -> Document {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Document::default(),
        Err(e) => {
            warn!(
                "Registry snapshot {} unreadable ({}), starting empty",
                path.display(),
                e
            );
            return Document::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(
                "Registry snapshot {} malformed ({}), starting empty",
                path.display(),
                e
            );
            Document::default()
        }
    }
}

/// Serialize the full document and atomically replace the snapshot:
/// write a sibling temp file, then rename it over the target. A crash
/// mid-write leaves either the old snapshot or the new one, never a
/// partially-applied file.
fn write_snapshot(path: &Path, doc: &Document) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let bytes = serde_json::to_vec_pretty(doc)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_in(dir: &tempfile::TempDir) -> Registry {
        Registry::open(dir.path().join("registry.json"))
    }

    #[tokio::test]
    async fn test_upsert_creates_then_returns_existing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);

        let first = registry
            .upsert_user(7, Some("Ada"), Some("ada"))
            .await
            .unwrap();
        assert!(first.is_active);
        assert!(first.messages.is_empty());

        // Second upsert must not touch the existing record.
        let second = registry
            .upsert_user(7, Some("Renamed"), None)
            .await
            .unwrap();
        assert_eq!(second.joined_at, first.joined_at);
        assert_eq!(second.display_name.as_deref(), Some("Ada"));
        assert_eq!(second.handle.as_deref(), Some("ada"));

        let all = registry.list_active_users().await;
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_append_is_ordered_and_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);

        registry.upsert_user(1, Some("Ada"), None).await.unwrap();
        for i in 0..4 {
            registry
                .append_message(1, &format!("msg {i}"), false)
                .await
                .unwrap();
        }

        let user = registry.get_user(1).await.unwrap();
        assert_eq!(user.messages.len(), 4);
        let texts: Vec<&str> = user.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["msg 0", "msg 1", "msg 2", "msg 3"]);
        for pair in user.messages.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_append_to_unknown_user_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);

        let err = registry.append_message(99, "hello", false).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(99)));
    }

    #[tokio::test]
    async fn test_set_active_gates_listing_and_is_reversible() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);

        registry.upsert_user(1, Some("Ada"), None).await.unwrap();
        registry.upsert_user(2, Some("Bo"), None).await.unwrap();

        registry.set_active(2, false).await.unwrap();
        let active: Vec<UserId> = registry
            .list_active_users()
            .await
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(active, vec![1]);

        // Deactivated users stay resolvable by id.
        assert!(!registry.get_user(2).await.unwrap().is_active);

        registry.set_active(2, true).await.unwrap();
        assert_eq!(registry.list_active_users().await.len(), 2);

        // Setting the current value again still succeeds.
        registry.set_active(2, true).await.unwrap();

        let err = registry.set_active(42, false).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        {
            let registry = Registry::open(&path);
            registry.upsert_user(5, Some("Ada"), Some("ada")).await.unwrap();
            registry.append_message(5, "hello", false).await.unwrap();
            registry.set_active(5, false).await.unwrap();
        }

        let reopened = Registry::open(&path);
        let user = reopened.get_user(5).await.unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert_eq!(user.messages.len(), 1);
        assert!(!user.is_active);

        // The temp file must not survive a successful persist.
        assert!(!dir.path().join("registry.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_recovers_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, b"{\"users\": {\"1\": {\"id\":").unwrap();

        let registry = Registry::open(&path);
        assert!(registry.list_active_users().await.is_empty());

        // Subsequent operations function normally and re-establish the file.
        registry.upsert_user(1, Some("Ada"), None).await.unwrap();
        let reopened = Registry::open(&path);
        assert_eq!(reopened.list_active_users().await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("nope.json"));
        assert!(registry.list_active_users().await.is_empty());
        assert_eq!(registry.stats().await.total_users, 0);
    }

    #[tokio::test]
    async fn test_unused_document_sections_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(
            &path,
            br#"{"users": {}, "operator_messages": {"note": "keep me"}}"#,
        )
        .unwrap();

        let registry = Registry::open(&path);
        registry.upsert_user(1, None, None).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["operator_messages"]["note"], "keep me");
    }

    #[tokio::test]
    async fn test_stats_average_over_active_users() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);

        for id in 1..=3 {
            registry.upsert_user(id, None, None).await.unwrap();
        }
        for _ in 0..2 {
            registry.append_message(1, "a", false).await.unwrap();
        }
        for _ in 0..4 {
            registry.append_message(3, "c", false).await.unwrap();
        }

        let stats = registry.stats().await;
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.total_messages, 6);
        assert!((stats.average_messages - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_recent_active_users_ranked_and_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);

        for id in 1..=6 {
            registry.upsert_user(id, None, None).await.unwrap();
        }
        // User 2 spoke last, user 4 before that; the rest are quiet.
        registry.append_message(4, "earlier", false).await.unwrap();
        registry.append_message(2, "latest", false).await.unwrap();

        let recent = registry.recent_active_users(5).await;
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].id, 2);
        assert_eq!(recent[1].id, 4);

        // Blocked users never appear as candidates.
        registry.set_active(2, false).await.unwrap();
        let recent = registry.recent_active_users(5).await;
        assert_ne!(recent[0].id, 2);
    }
}
