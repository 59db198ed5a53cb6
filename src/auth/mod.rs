//! Credential storage and coordinated token refresh.

pub mod error;
pub mod manager;
pub mod session;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use manager::TokenManager;
pub use session::AuthSession;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreConfig, STORAGE_KEY};
pub use token::{is_access_token_expired, AuthTokens};
