//! Convenience re-exports.

pub use crate::auth::{
    is_access_token_expired, AuthError, AuthSession, AuthTokens, FileTokenStore,
    MemoryTokenStore, TokenStore,
};
pub use crate::client::{create_api_client, ApiClient, ApiClientOptions, ApiRequest, ApiResponse};
pub use crate::config::ClientConfig;
pub use crate::error::{ClientError, Result};
pub use crate::locale::resolve_locale;
