use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::store::{TokenStore, STORAGE_KEY};
use super::token::AuthTokens;

#[derive(Debug, Clone)]
enum TokenState {
    /// Durable storage has not been consulted yet.
    Unloaded,
    Loaded(Option<AuthTokens>),
}

impl TokenState {
    fn label(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loaded(Some(_)) => "present",
            Self::Loaded(None) => "empty",
        }
    }
}

/// Owner of the in-memory token pair with write-through to a [`TokenStore`].
///
/// The store is read at most once, on the first [`get`](Self::get); after
/// that the in-memory copy is authoritative.
pub struct TokenManager {
    store: Option<Arc<dyn TokenStore>>,
    state: Mutex<TokenState>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("store", &self.store.as_ref().map(|_| ".."))
            .field("state", &self.lock_state().label())
            .finish()
    }
}

impl TokenManager {
    /// Create a manager, optionally backed by durable storage.
    pub fn new(store: Option<Arc<dyn TokenStore>>) -> Self {
        Self {
            store,
            state: Mutex::new(TokenState::Unloaded),
        }
    }

    /// Current pair, lazily loading from storage on first access.
    pub fn get(&self) -> Option<AuthTokens> {
        let mut state = self.lock_state();
        if let TokenState::Loaded(tokens) = &*state {
            return tokens.clone();
        }
        let loaded = self.read_from_store();
        *state = TokenState::Loaded(loaded.clone());
        loaded
    }

    /// Replace the current pair, writing through when `persist` is set.
    pub fn set(&self, tokens: AuthTokens, persist: bool) -> AuthTokens {
        *self.lock_state() = TokenState::Loaded(Some(tokens.clone()));
        if persist {
            self.write_to_store(&tokens);
        }
        tokens
    }

    /// Forget the current pair and remove its durable copy.
    pub fn clear(&self) {
        *self.lock_state() = TokenState::Loaded(None);
        if let Some(store) = &self.store {
            if let Err(err) = store.remove(STORAGE_KEY) {
                warn!(error = %err, "Unable to remove auth tokens from storage");
            }
        }
    }

    fn read_from_store(&self) -> Option<AuthTokens> {
        let store = self.store.as_ref()?;
        let raw = match store.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "Unable to read auth tokens from storage");
                return None;
            }
        };
        match serde_json::from_str::<AuthTokens>(&raw) {
            Ok(tokens) => {
                debug!("Loaded auth tokens from storage");
                Some(tokens)
            }
            Err(err) => {
                warn!(error = %err, "Unable to parse auth tokens from storage");
                if let Err(err) = store.remove(STORAGE_KEY) {
                    warn!(error = %err, "Unable to remove corrupt auth tokens");
                }
                None
            }
        }
    }

    fn write_to_store(&self, tokens: &AuthTokens) {
        let Some(store) = &self.store else {
            return;
        };
        let serialized = match serde_json::to_string(tokens) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(error = %err, "Unable to serialize auth tokens");
                return;
            }
        };
        if let Err(err) = store.set(STORAGE_KEY, &serialized) {
            warn!(error = %err, "Unable to persist auth tokens");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryTokenStore;
    use crate::auth::AuthError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts reads so tests can check the store is consulted once.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryTokenStore,
        reads: AtomicUsize,
    }

    impl TokenStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), AuthError> {
            self.inner.remove(key)
        }
    }

    /// Store whose every operation fails.
    struct FailingStore;

    impl TokenStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, AuthError> {
            Err(AuthError::Storage("read denied".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), AuthError> {
            Err(AuthError::Storage("write denied".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), AuthError> {
            Err(AuthError::Storage("remove denied".to_string()))
        }
    }

    #[test]
    fn store_failures_leave_memory_state_intact() {
        let manager = TokenManager::new(Some(Arc::new(FailingStore)));
        assert_eq!(manager.get(), None);

        let tokens = AuthTokens::new("access", "refresh");
        assert_eq!(manager.set(tokens.clone(), true), tokens);
        assert_eq!(manager.get(), Some(tokens));

        manager.clear();
        assert_eq!(manager.get(), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let manager = TokenManager::new(None);
        let tokens = AuthTokens::new("access", "refresh");
        manager.set(tokens.clone(), true);
        assert_eq!(manager.get(), Some(tokens));
    }

    #[test]
    fn clear_then_get_is_none() {
        let store = Arc::new(MemoryTokenStore::new());
        let manager = TokenManager::new(Some(store.clone()));
        manager.set(AuthTokens::new("access", "refresh"), true);
        manager.clear();
        assert_eq!(manager.get(), None);
        assert!(store.get(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn persist_false_skips_storage() {
        let store = Arc::new(MemoryTokenStore::new());
        let manager = TokenManager::new(Some(store.clone()));
        manager.set(AuthTokens::new("access", "refresh"), false);
        assert!(store.get(STORAGE_KEY).unwrap().is_none());
        assert!(manager.get().is_some());
    }

    #[test]
    fn loads_from_storage_once() {
        let store = Arc::new(CountingStore::default());
        let tokens = AuthTokens::new("stored", "refresh");
        store
            .set(STORAGE_KEY, &serde_json::to_string(&tokens).unwrap())
            .unwrap();
        let manager = TokenManager::new(Some(store.clone()));

        assert_eq!(manager.get(), Some(tokens.clone()));
        assert_eq!(manager.get(), Some(tokens));
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_storage_is_not_reread() {
        let store = Arc::new(CountingStore::default());
        let manager = TokenManager::new(Some(store.clone()));

        assert_eq!(manager.get(), None);
        assert_eq!(manager.get(), None);
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn corrupt_entry_is_discarded() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(STORAGE_KEY, "{not-json").unwrap();
        let manager = TokenManager::new(Some(store.clone()));

        assert_eq!(manager.get(), None);
        assert!(store.get(STORAGE_KEY).unwrap().is_none());
    }
}
