use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Access/refresh token pair held by an [`AuthSession`](super::AuthSession).
///
/// Stored as camelCase JSON with `expiresAt` in epoch milliseconds.
///
/// # Example
/// ```
/// use apatie_client::auth::AuthTokens;
/// use chrono::{Duration, Utc};
///
/// let tokens = AuthTokens::new("access", "refresh")
///     .with_expires_at(Utc::now() + Duration::seconds(60));
/// assert!(!tokens.is_expired());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthTokens {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Expired when `now >= expires_at`. A pair without expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

/// Whether the access token in `tokens` has passed its expiry.
///
/// Returns `false` when there is no pair or the pair carries no expiry.
pub fn is_access_token_expired(tokens: Option<&AuthTokens>) -> bool {
    tokens.is_some_and(AuthTokens::is_expired)
}

/// Body returned by the token endpoints (`auth/jwt/create/`, `auth/jwt/refresh/`).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    /// Seconds until the new access token expires.
    #[serde(default)]
    pub expires_in: Option<f64>,
}

impl TokenResponse {
    /// Build the next pair, keeping the previous refresh token and expiry
    /// where the server omitted them.
    ///
    /// An `expires_in` outside the representable date range is rejected.
    pub(crate) fn into_tokens(
        self,
        previous: Option<&AuthTokens>,
        now: DateTime<Utc>,
    ) -> Result<AuthTokens, AuthError> {
        let expires_at = match self.expires_in {
            Some(secs) if secs.is_finite() => {
                let expires_at = TimeDelta::try_milliseconds((secs * 1000.0) as i64)
                    .and_then(|lifetime| now.checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        AuthError::InvalidResponse(format!("expires_in out of range: {secs}"))
                    })?;
                Some(expires_at)
            }
            _ => previous.and_then(|tokens| tokens.expires_at),
        };
        let refresh_token = self
            .refresh
            .or_else(|| previous.map(|tokens| tokens.refresh_token.clone()))
            .unwrap_or_default();
        Ok(AuthTokens {
            access_token: self.access,
            refresh_token,
            expires_at,
        })
    }
}
