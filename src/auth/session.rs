use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, warn};

use super::error::AuthError;
use super::manager::TokenManager;
use super::store::{FileTokenStore, TokenStore, TokenStoreConfig};
use super::token::{AuthTokens, TokenResponse};
use crate::config::ClientConfig;

static DEFAULT_SESSION: OnceLock<Arc<AuthSession>> = OnceLock::new();

type RefreshFuture = Shared<BoxFuture<'static, Result<AuthTokens, AuthError>>>;

struct InFlightRefresh {
    id: u64,
    future: RefreshFuture,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// Credential state shared by every [`ApiClient`](crate::client::ApiClient)
/// bound to it.
///
/// Owns the token pair and the single in-flight refresh. Concurrent callers
/// that need a refresh all await the same exchange.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use apatie_client::auth::{AuthSession, AuthTokens};
///
/// let session = Arc::new(AuthSession::in_memory());
/// session.update_auth_tokens(AuthTokens::new("access", "refresh"), false);
/// assert!(session.is_authenticated());
/// session.clear_authentication();
/// assert!(session.get_auth_tokens().is_none());
/// ```
pub struct AuthSession {
    tokens: TokenManager,
    in_flight: Mutex<Option<InFlightRefresh>>,
    next_refresh_id: AtomicU64,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("tokens", &self.tokens)
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

impl AuthSession {
    /// Create a session, optionally mirroring tokens to durable storage.
    pub fn new(store: Option<Arc<dyn TokenStore>>) -> Self {
        Self {
            tokens: TokenManager::new(store),
            in_flight: Mutex::new(None),
            next_refresh_id: AtomicU64::new(0),
        }
    }

    /// Session without durable storage.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Process-wide session backed by the file store in
    /// [`ClientConfig::token_dir`].
    pub fn global() -> Arc<AuthSession> {
        DEFAULT_SESSION
            .get_or_init(|| {
                let dir = ClientConfig::global().token_dir.clone();
                let store = FileTokenStore::new(TokenStoreConfig::new(dir));
                Arc::new(Self::new(Some(Arc::new(store))))
            })
            .clone()
    }

    pub fn get_auth_tokens(&self) -> Option<AuthTokens> {
        self.tokens.get()
    }

    pub fn set_auth_tokens(&self, tokens: AuthTokens, persist: bool) -> AuthTokens {
        self.tokens.set(tokens, persist)
    }

    pub fn clear_auth_tokens(&self) {
        self.tokens.clear();
    }

    /// Install a pair obtained outside the client (e.g. a login screen).
    pub fn update_auth_tokens(&self, tokens: AuthTokens, persist: bool) -> AuthTokens {
        self.set_auth_tokens(tokens, persist)
    }

    pub fn clear_authentication(&self) {
        self.clear_auth_tokens();
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_auth_tokens()
            .is_some_and(|tokens| !tokens.access_token.is_empty())
    }

    /// Whether a refresh exchange is currently underway.
    pub fn is_refreshing(&self) -> bool {
        self.lock_in_flight().is_some()
    }

    /// Exchange the refresh token for a new pair, joining any refresh that
    /// is already in flight.
    ///
    /// The exchange runs on its own task, so it completes and commits even
    /// if every caller stops waiting. On failure all credentials are cleared.
    pub async fn refresh(
        self: &Arc<Self>,
        http: &reqwest::Client,
        refresh_url: &Url,
    ) -> Result<AuthTokens, AuthError> {
        let future = {
            let mut slot = self.lock_in_flight();
            match slot.as_ref() {
                Some(existing) => {
                    debug!(refresh_id = existing.id, "Joining in-flight token refresh");
                    existing.future.clone()
                }
                None => {
                    let current = self
                        .tokens
                        .get()
                        .filter(AuthTokens::has_refresh_token)
                        .ok_or(AuthError::MissingRefreshToken)?;
                    let id = self.next_refresh_id.fetch_add(1, Ordering::Relaxed);
                    debug!(refresh_id = id, url = %refresh_url, "Starting token refresh");
                    let future = self.spawn_refresh(id, http.clone(), refresh_url.clone(), current);
                    *slot = Some(InFlightRefresh {
                        id,
                        future: future.clone(),
                    });
                    future
                }
            }
        };
        future.await
    }

    /// Spawn the exchange task. Must be called with the in-flight slot
    /// locked so the task cannot unregister before it is registered.
    fn spawn_refresh(
        self: &Arc<Self>,
        id: u64,
        http: reqwest::Client,
        refresh_url: Url,
        current: AuthTokens,
    ) -> RefreshFuture {
        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = exchange_refresh_token(&http, &refresh_url, &current).await;
            session.settle(id, &outcome);
            outcome
        });

        let session = Arc::clone(self);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    let outcome = Err(AuthError::Network(format!("refresh task failed: {err}")));
                    session.settle(id, &outcome);
                    outcome
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Commit or clear credentials, then unregister refresh `id`.
    fn settle(&self, id: u64, outcome: &Result<AuthTokens, AuthError>) {
        match outcome {
            Ok(tokens) => {
                self.tokens.set(tokens.clone(), true);
                debug!(refresh_id = id, "Token refresh committed");
            }
            Err(err) => {
                warn!(refresh_id = id, error = %err, "Token refresh failed; clearing credentials");
                self.tokens.clear();
            }
        }
        let mut slot = self.lock_in_flight();
        if slot.as_ref().is_some_and(|in_flight| in_flight.id == id) {
            *slot = None;
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlightRefresh>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn exchange_refresh_token(
    http: &reqwest::Client,
    refresh_url: &Url,
    current: &AuthTokens,
) -> Result<AuthTokens, AuthError> {
    let resp = http
        .post(refresh_url.clone())
        .header(ACCEPT, "application/json")
        .json(&RefreshRequest {
            refresh: &current.refresh_token,
        })
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(AuthError::Rejected {
            status: status.as_u16(),
        });
    }
    let payload: TokenResponse = resp
        .json()
        .await
        .map_err(|err| AuthError::InvalidResponse(err.to_string()))?;
    payload.into_tokens(Some(current), Utc::now())
}
