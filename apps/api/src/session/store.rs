//! Session Store: the single source of truth for "who is logged in".
//!
//! Identity and linked profile live behind one lock and are always
//! persisted and replaced together, so a reader never sees a connected
//! flag without a profile or a profile without an identity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::identity::ProfileUpdate;
use crate::models::{ExternalProfile, Identity};
use crate::storage::{load_json, save_json, KeyValueStore, StorageError, PROFILE_KEY, USER_KEY};

pub const INIT_ERROR_MESSAGE: &str = "Failed to retrieve authentication status";

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    profile: Option<ExternalProfile>,
    last_error: Option<String>,
}

/// Point-in-time copy of the session, as read by views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current_identity: Option<Identity>,
    pub external_profile: Option<ExternalProfile>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    state: RwLock<SessionState>,
    is_loading: AtomicBool,
}

impl SessionStore {
    /// A new store is loading until `initialize()` completes.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            state: RwLock::new(SessionState::default()),
            is_loading: AtomicBool::new(true),
        }
    }

    /// Restores the persisted session. Read or parse failures are recorded
    /// in `last_error` and leave the session anonymous.
    ///
    /// Startup only: this bypasses `AuthService`'s single-flight lock and
    /// clears `is_loading` when done, so it must run before any auth
    /// operation can start.
    pub(crate) async fn initialize(&self) {
        self.set_loading(true);
        let mut state = self.state.write().await;

        match self.load_persisted() {
            Ok((identity, profile)) => {
                match &identity {
                    Some(user) => info!(
                        "Restored session for {} (linked profile: {})",
                        user.email,
                        profile.is_some()
                    ),
                    None => info!("No persisted session; starting anonymous"),
                }
                state.identity = identity;
                state.profile = profile;
            }
            Err(e) => {
                warn!("Could not restore persisted session: {e}");
                state.identity = None;
                state.profile = None;
                state.last_error = Some(INIT_ERROR_MESSAGE.to_string());
            }
        }

        drop(state);
        self.set_loading(false);
    }

    fn load_persisted(
        &self,
    ) -> Result<(Option<Identity>, Option<ExternalProfile>), StorageError> {
        let storage = &*self.storage;
        let identity: Option<Identity> = load_json(storage, USER_KEY)?;
        let profile: Option<ExternalProfile> = load_json(storage, PROFILE_KEY)?;

        // Repairs are best-effort: the session is restored even if the
        // cleanup write fails, and the next start repairs again.
        match (identity, profile) {
            (None, Some(_)) => {
                warn!("Discarding linked profile persisted without a user");
                Self::repair(storage.remove(PROFILE_KEY));
                Ok((None, None))
            }
            (Some(identity), Some(_)) if !identity.linked_profile_connected => {
                warn!("Discarding linked profile for disconnected user {}", identity.id);
                Self::repair(storage.remove(PROFILE_KEY));
                Ok((Some(identity), None))
            }
            (Some(mut identity), None) if identity.linked_profile_connected => {
                warn!("User {} flagged as linked without a profile; clearing flag", identity.id);
                identity.linked_profile_connected = false;
                Self::repair(save_json(storage, USER_KEY, &identity));
                Ok((Some(identity), None))
            }
            restored => Ok(restored),
        }
    }

    fn repair(result: Result<(), StorageError>) {
        if let Err(e) = result {
            warn!("Stored session left unrepaired: {e}");
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            current_identity: state.identity.clone(),
            external_profile: state.profile.clone(),
            is_authenticated: state.identity.is_some(),
            is_loading: self.is_loading(),
            last_error: state.last_error.clone(),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.identity.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.is_loading.store(loading, Ordering::SeqCst);
    }

    pub async fn current_identity(&self) -> Option<Identity> {
        self.state.read().await.identity.clone()
    }

    #[allow(dead_code)]
    pub async fn external_profile(&self) -> Option<ExternalProfile> {
        self.state.read().await.profile.clone()
    }

    pub(crate) async fn set_last_error(&self, message: Option<String>) {
        self.state.write().await.last_error = message;
    }

    /// Makes `identity` the current user. Any profile linked to the
    /// previous session is dropped with it.
    ///
    /// The user document is written first. A profile left behind by a failed
    /// removal sits beside an unlinked identity, which `initialize()` discards.
    pub(crate) async fn begin_session(&self, identity: Identity) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let storage = &*self.storage;
        save_json(storage, USER_KEY, &identity)?;
        if let Err(e) = storage.remove(PROFILE_KEY) {
            warn!("Stale linked profile left in storage: {e}");
        }
        state.identity = Some(identity);
        state.profile = None;
        Ok(())
    }

    /// Clears the session in memory unconditionally. Both keys are always
    /// attempted, profile first; the first storage failure is returned.
    pub(crate) async fn end_session(&self) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let storage = &*self.storage;
        let profile_removed = storage.remove(PROFILE_KEY);
        let user_removed = storage.remove(USER_KEY);
        state.identity = None;
        state.profile = None;
        profile_removed.and(user_removed)
    }

    /// Attaches `profile` to the current user and flags them as linked.
    pub(crate) async fn link_profile(
        &self,
        profile: ExternalProfile,
    ) -> Result<ExternalProfile, AppError> {
        let mut state = self.state.write().await;
        let mut identity = state
            .identity
            .clone()
            .ok_or_else(|| AppError::validation("No signed-in user to link a profile to"))?;
        identity.linked_profile_connected = true;

        let storage = &*self.storage;
        save_json(storage, PROFILE_KEY, &profile)?;
        if let Err(e) = save_json(storage, USER_KEY, &identity) {
            // keep storage consistent with the unchanged in-memory session
            let _ = storage.remove(PROFILE_KEY);
            return Err(e.into());
        }

        state.identity = Some(identity);
        state.profile = Some(profile.clone());
        Ok(profile)
    }

    pub(crate) async fn unlink_profile(&self) -> Result<Identity, AppError> {
        let mut state = self.state.write().await;
        let mut identity = state
            .identity
            .clone()
            .ok_or_else(|| AppError::validation("No signed-in user to disconnect"))?;
        identity.linked_profile_connected = false;

        // Profile goes first: a failure here changes nothing, and a flagged
        // identity without a profile is unflagged by `initialize()`.
        let storage = &*self.storage;
        storage.remove(PROFILE_KEY)?;
        if let Err(e) = save_json(storage, USER_KEY, &identity) {
            warn!("Linked flag for {} not persisted: {e}", identity.id);
        }

        state.identity = Some(identity.clone());
        state.profile = None;
        Ok(identity)
    }

    pub(crate) async fn update_identity(&self, update: ProfileUpdate) -> Result<Identity, AppError> {
        let mut state = self.state.write().await;
        let mut identity = state.identity.clone().ok_or(AppError::Unauthorized)?;
        update.apply_to(&mut identity);

        save_json(&*self.storage, USER_KEY, &identity)?;
        state.identity = Some(identity.clone());
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FaultyStore, FileStore, MemoryStore};
    use chrono::Utc;
    use serde_json::json;

    fn sample_profile() -> ExternalProfile {
        ExternalProfile {
            id: "linkedin123".into(),
            raw_data: json!({ "headline": "Engineer" }),
            parsed_data: Default::default(),
            last_synced: Utc::now(),
        }
    }

    fn store_with(memory: &Arc<MemoryStore>) -> SessionStore {
        SessionStore::new(memory.clone())
    }

    #[tokio::test]
    async fn test_new_store_is_loading_until_initialized() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        assert!(store.is_loading());

        store.initialize().await;

        let snap = store.snapshot().await;
        assert!(!snap.is_loading);
        assert!(!snap.is_authenticated);
        assert!(snap.last_error.is_none());
    }

    #[tokio::test]
    async fn test_identity_round_trips_through_fresh_store() {
        let memory = Arc::new(MemoryStore::new());
        let identity = Identity::new("user1", "ada@example.com", "Ada", "Lovelace");

        let first = store_with(&memory);
        first.initialize().await;
        first.begin_session(identity.clone()).await.unwrap();

        let second = store_with(&memory);
        second.initialize().await;
        assert_eq!(second.current_identity().await, Some(identity));
        assert!(second.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_round_trip_through_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let identity = Identity::new("user1", "ada@example.com", "Ada", "Lovelace");

        let first = SessionStore::new(Arc::new(FileStore::new(tmp.path())));
        first.initialize().await;
        first.begin_session(identity.clone()).await.unwrap();
        first.link_profile(sample_profile()).await.unwrap();

        let second = SessionStore::new(Arc::new(FileStore::new(tmp.path())));
        second.initialize().await;
        let snap = second.snapshot().await;
        let restored = snap.current_identity.unwrap();
        assert_eq!(restored.id, identity.id);
        assert_eq!(restored.created_at, identity.created_at);
        assert!(restored.linked_profile_connected);
        assert_eq!(snap.external_profile.map(|p| p.id).as_deref(), Some("linkedin123"));
    }

    #[tokio::test]
    async fn test_corrupt_storage_sets_last_error() {
        let memory = Arc::new(MemoryStore::new());
        memory.set(USER_KEY, "{broken").unwrap();

        let store = store_with(&memory);
        store.initialize().await;

        let snap = store.snapshot().await;
        assert!(!snap.is_loading);
        assert!(snap.current_identity.is_none());
        assert!(snap.external_profile.is_none());
        assert_eq!(snap.last_error.as_deref(), Some(INIT_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_orphan_profile_is_discarded_on_load() {
        let memory = Arc::new(MemoryStore::new());
        save_json(&*memory, PROFILE_KEY, &sample_profile()).unwrap();

        let store = store_with(&memory);
        store.initialize().await;

        assert!(store.external_profile().await.is_none());
        assert!(!memory.contains_key(PROFILE_KEY));
    }

    #[tokio::test]
    async fn test_linked_flag_without_profile_is_cleared_on_load() {
        let memory = Arc::new(MemoryStore::new());
        let mut identity = Identity::new("user1", "ada@example.com", "Ada", "Lovelace");
        identity.linked_profile_connected = true;
        save_json(&*memory, USER_KEY, &identity).unwrap();

        let store = store_with(&memory);
        store.initialize().await;

        let restored = store.current_identity().await.unwrap();
        assert!(!restored.linked_profile_connected);
        let persisted: Identity = load_json(&*memory, USER_KEY).unwrap().unwrap();
        assert!(!persisted.linked_profile_connected);
    }

    #[tokio::test]
    async fn test_link_requires_identity() {
        let memory = Arc::new(MemoryStore::new());
        let store = store_with(&memory);
        store.initialize().await;

        let err = store.link_profile(sample_profile()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!memory.contains_key(PROFILE_KEY));
    }

    #[tokio::test]
    async fn test_end_session_clears_memory_and_storage() {
        let memory = Arc::new(MemoryStore::new());
        let store = store_with(&memory);
        store.initialize().await;
        store
            .begin_session(Identity::new("user1", "a@b.co", "Ada", "Lovelace"))
            .await
            .unwrap();
        store.link_profile(sample_profile()).await.unwrap();

        store.end_session().await.unwrap();

        let snap = store.snapshot().await;
        assert!(snap.current_identity.is_none());
        assert!(snap.external_profile.is_none());
        assert!(!memory.contains_key(USER_KEY));
        assert!(!memory.contains_key(PROFILE_KEY));
    }

    #[tokio::test]
    async fn test_new_session_drops_previous_profile() {
        let memory = Arc::new(MemoryStore::new());
        let store = store_with(&memory);
        store.initialize().await;
        store
            .begin_session(Identity::new("user1", "a@b.co", "Ada", "Lovelace"))
            .await
            .unwrap();
        store.link_profile(sample_profile()).await.unwrap();

        store
            .begin_session(Identity::new("user2", "c@d.co", "Cy", "Young"))
            .await
            .unwrap();

        assert!(store.external_profile().await.is_none());
        assert!(!memory.contains_key(PROFILE_KEY));
    }

    async fn linked_session(faulty: &Arc<FaultyStore>) -> SessionStore {
        let store = SessionStore::new(faulty.clone());
        store.initialize().await;
        store
            .begin_session(Identity::new("user1", "a@b.co", "Ada", "Lovelace"))
            .await
            .unwrap();
        store.link_profile(sample_profile()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_end_session_clears_memory_when_profile_removal_fails() {
        let faulty = Arc::new(FaultyStore::new());
        let store = linked_session(&faulty).await;
        faulty.fail_remove(PROFILE_KEY);

        let err = store.end_session().await.unwrap_err();

        assert!(matches!(err, StorageError::Io { .. }));
        let snap = store.snapshot().await;
        assert!(!snap.is_authenticated);
        assert!(snap.external_profile.is_none());
        assert!(!faulty.contains_key(USER_KEY));

        // leftover profile has no owner and is dropped on the next start
        let restarted = SessionStore::new(faulty.clone());
        restarted.initialize().await;
        let snap = restarted.snapshot().await;
        assert!(snap.current_identity.is_none());
        assert!(snap.external_profile.is_none());
    }

    #[tokio::test]
    async fn test_unlink_is_unchanged_when_profile_removal_fails() {
        let faulty = Arc::new(FaultyStore::new());
        let store = linked_session(&faulty).await;
        faulty.fail_remove(PROFILE_KEY);

        let err = store.unlink_profile().await.unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        let snap = store.snapshot().await;
        assert!(snap.current_identity.unwrap().linked_profile_connected);
        assert!(snap.external_profile.is_some());
        let persisted: Identity = load_json(&*faulty, USER_KEY).unwrap().unwrap();
        assert!(persisted.linked_profile_connected);
        assert!(faulty.contains_key(PROFILE_KEY));
    }

    #[tokio::test]
    async fn test_unlink_matches_restart_when_flag_write_fails() {
        let faulty = Arc::new(FaultyStore::new());
        let store = linked_session(&faulty).await;
        faulty.fail_set(USER_KEY);

        let identity = store.unlink_profile().await.unwrap();

        assert!(!identity.linked_profile_connected);
        assert!(store.external_profile().await.is_none());
        assert!(!faulty.contains_key(PROFILE_KEY));

        let restarted = SessionStore::new(faulty.clone());
        restarted.initialize().await;
        let restored = restarted.current_identity().await.unwrap();
        assert!(!restored.linked_profile_connected);
        assert!(restarted.external_profile().await.is_none());
    }

    #[tokio::test]
    async fn test_begin_session_keeps_old_session_when_user_write_fails() {
        let faulty = Arc::new(FaultyStore::new());
        let store = linked_session(&faulty).await;
        faulty.fail_set(USER_KEY);

        store
            .begin_session(Identity::new("user2", "c@d.co", "Cy", "Young"))
            .await
            .unwrap_err();

        let snap = store.snapshot().await;
        assert_eq!(snap.current_identity.map(|i| i.id).as_deref(), Some("user1"));
        assert!(snap.external_profile.is_some());
        assert!(faulty.contains_key(PROFILE_KEY));
    }

    #[tokio::test]
    async fn test_begin_session_stale_profile_is_dropped_on_restart() {
        let faulty = Arc::new(FaultyStore::new());
        let store = linked_session(&faulty).await;
        faulty.fail_remove(PROFILE_KEY);

        store
            .begin_session(Identity::new("user2", "c@d.co", "Cy", "Young"))
            .await
            .unwrap();
        assert!(store.external_profile().await.is_none());

        let restarted = SessionStore::new(faulty.clone());
        restarted.initialize().await;
        assert_eq!(
            restarted.current_identity().await.map(|i| i.id).as_deref(),
            Some("user2")
        );
        assert!(restarted.external_profile().await.is_none());
    }
}
