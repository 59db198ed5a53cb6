//! Apatie API client.
//!
//! Authenticated HTTP client for the Apatie REST API: JSON and locale
//! headers on every request, bearer tokens from a shared [`auth::AuthSession`],
//! proactive refresh of expired tokens and a single retry after a 401. All
//! requests that need a refresh at the same time share one exchange.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use apatie_client::prelude::*;
//!
//! # async fn example() -> apatie_client::error::Result<()> {
//! let session = Arc::new(AuthSession::in_memory());
//! let client = ApiClient::new(
//!     session.clone(),
//!     ApiClientOptions::builder().base_url("http://localhost:8000/api/v1").build(),
//! )?;
//! session.update_auth_tokens(AuthTokens::new("access", "refresh"), false);
//! let users = client.get("/users").await?;
//! println!("{}", users.text());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod locale;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
