//! Authenticated API client with header injection and refresh-and-retry.

pub mod request;
pub mod url;

pub use request::{ApiRequest, ApiResponse};

use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use chrono::Utc;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE,
};
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, warn};

use self::url::{is_auth_route, join_path, resolve_endpoint, LOGIN_PATH, REFRESH_PATH};
use crate::auth::token::TokenResponse;
use crate::auth::{is_access_token_expired, AuthError, AuthSession, AuthTokens};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::locale::resolve_locale;

/// Construction options; unset fields fall back to [`ClientConfig::global`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use apatie_client::client::ApiClientOptions;
///
/// let options = ApiClientOptions::builder()
///     .base_url("https://api.example.com/api/v1")
///     .timeout(Duration::from_secs(5))
///     .language("en")
///     .build();
/// assert_eq!(options.language.as_deref(), Some("en"));
/// ```
#[derive(Debug, Clone, Default, Builder)]
pub struct ApiClientOptions {
    #[builder(into)]
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    /// Caller's language preference, resolved into `Accept-Language`.
    #[builder(into)]
    pub language: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// HTTP client for the Apatie API.
///
/// Every request gets JSON and locale headers plus a bearer token from the
/// bound [`AuthSession`]. Expired tokens are refreshed before sending; a 401
/// triggers one shared refresh and a single retry.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use apatie_client::auth::AuthSession;
/// use apatie_client::client::{ApiClient, ApiClientOptions};
///
/// # async fn example() -> apatie_client::error::Result<()> {
/// let session = Arc::new(AuthSession::in_memory());
/// let client = ApiClient::new(
///     session,
///     ApiClientOptions::builder().base_url("https://api.example.com/api/v1").build(),
/// )?;
/// client.login("user", "secret").await?;
/// let services: serde_json::Value = client.get("/services").await?.json()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    session: Arc<AuthSession>,
    base_url: String,
    refresh_url: Url,
    login_url: Url,
    locale: HeaderValue,
    timeout: Duration,
}

/// Create a client bound to the process-wide [`AuthSession::global`].
pub fn create_api_client(options: ApiClientOptions) -> Result<ApiClient> {
    ApiClient::new(AuthSession::global(), options)
}

impl ApiClient {
    pub fn new(session: Arc<AuthSession>, options: ApiClientOptions) -> Result<Self> {
        let config = ClientConfig::global();
        let base_url = options.base_url.unwrap_or_else(|| config.base_url.clone());
        let timeout = options.timeout.unwrap_or(config.timeout);
        let language = options
            .language
            .unwrap_or_else(|| config.language.clone());

        let refresh_url = resolve_endpoint(&base_url, REFRESH_PATH)?;
        let login_url = resolve_endpoint(&base_url, LOGIN_PATH)?;
        let locale = HeaderValue::from_str(&resolve_locale(&language)).map_err(|_| {
            ClientError::Configuration(format!("invalid language preference '{language}'"))
        })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::Configuration(err.to_string()))?;

        Ok(Self {
            http,
            session,
            base_url,
            refresh_url,
            login_url,
            locale,
            timeout,
        })
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }

    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(path)).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send(ApiRequest::post(path).with_json(body)?).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send(ApiRequest::put(path).with_json(body)?).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send(ApiRequest::patch(path).with_json(body)?).await
    }

    /// Send a request through the full pipeline, retrying once after a
    /// successful refresh when the server answers 401.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        loop {
            let error = match self.dispatch(&request).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };
            request = self.recover(request, error).await?;
        }
    }

    /// Exchange credentials for a token pair and persist it in the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthTokens> {
        let request = ApiRequest::post(self.login_url.as_str())
            .with_json(&LoginRequest { username, password })?;
        let payload: TokenResponse = self.send(request).await?.json()?;
        if payload.refresh.is_none() {
            return Err(AuthError::InvalidResponse(
                "login response is missing a refresh token".to_string(),
            )
            .into());
        }
        let tokens = payload.into_tokens(None, Utc::now())?;
        debug!("Login succeeded");
        Ok(self.session.set_auth_tokens(tokens, true))
    }

    pub fn logout(&self) {
        self.session.clear_authentication();
    }

    /// Apply outgoing interception and transmit one attempt.
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = join_path(&self.base_url, &request.path)?;
        let headers = self.prepare_headers(request, &url).await?;

        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        debug!(method = %request.method, url = %url, retry = request.is_retry(), "Sending API request");
        let resp = builder
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?
            .to_vec();

        if !status.is_success() {
            debug!(status = status.as_u16(), url = %url, "API request failed");
            return Err(ClientError::api(
                status.as_u16(),
                String::from_utf8_lossy(&body),
            ));
        }
        Ok(ApiResponse::new(status, headers, body))
    }

    async fn prepare_headers(&self, request: &ApiRequest, url: &Url) -> Result<HeaderMap> {
        let mut headers = request.headers.clone();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, self.locale.clone());
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if is_auth_route(url) {
            return Ok(headers);
        }

        let access_token = match request.refreshed_access_token() {
            Some(token) => Some(token.to_string()),
            None => self.current_access_token().await?,
        };
        if let Some(token) = access_token.filter(|token| !token.is_empty()) {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Access token is not a valid header value; sending unauthenticated"),
            }
        }
        Ok(headers)
    }

    /// Access token to attach, refreshing first when the stored one expired.
    async fn current_access_token(&self) -> Result<Option<String>> {
        let tokens = self.session.get_auth_tokens();
        if !is_access_token_expired(tokens.as_ref()) {
            return Ok(tokens.map(|tokens| tokens.access_token));
        }
        debug!("Access token expired; refreshing before request");
        let refreshed = self.session.refresh(&self.http, &self.refresh_url).await?;
        Ok(Some(refreshed.access_token))
    }

    /// Response interception: decide whether `error` is recoverable by a
    /// refresh, returning the request to resubmit.
    async fn recover(&self, request: ApiRequest, error: ClientError) -> Result<ApiRequest> {
        if !error.has_response() || self.targets_auth_route(&request) {
            return Err(error);
        }
        if !error.is_unauthorized() || request.is_retry() {
            return Err(error);
        }

        let can_refresh = self
            .session
            .get_auth_tokens()
            .is_some_and(|tokens| tokens.has_refresh_token());
        if !can_refresh {
            debug!("Received 401 without a refresh token; clearing credentials");
            self.session.clear_auth_tokens();
            return Err(error);
        }

        debug!(path = %request.path, "Received 401; refreshing and retrying once");
        match self.session.refresh(&self.http, &self.refresh_url).await {
            Ok(tokens) => Ok(request.into_retry(tokens.access_token)),
            Err(err) => {
                self.session.clear_auth_tokens();
                Err(ClientError::Auth(err))
            }
        }
    }

    fn targets_auth_route(&self, request: &ApiRequest) -> bool {
        join_path(&self.base_url, &request.path)
            .map(|url| is_auth_route(&url))
            .unwrap_or(false)
    }

    fn transport_error(&self, error: reqwest::Error) -> ClientError {
        if error.is_timeout() {
            ClientError::Timeout(timeout_millis(self.timeout))
        } else {
            ClientError::Network(error)
        }
    }
}

fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(timeout_millis(Duration::MAX), u64::MAX);
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(
            Arc::new(AuthSession::in_memory()),
            ApiClientOptions::builder()
                .base_url(base_url)
                .language("en")
                .build(),
        )
        .unwrap()
    }

    #[test]
    fn construction_resolves_token_endpoints() {
        let client = client("https://api.test.local/api/v1");
        assert_eq!(
            client.refresh_url().as_str(),
            "https://api.test.local/api/auth/jwt/refresh/"
        );
        assert_eq!(
            client.login_url().as_str(),
            "https://api.test.local/api/auth/jwt/create/"
        );
    }

    #[test]
    fn construction_rejects_invalid_base_url() {
        let err = ApiClient::new(
            Arc::new(AuthSession::in_memory()),
            ApiClientOptions::builder().base_url("::nope::").build(),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn unset_timeout_uses_config_default() {
        let client = ApiClient::new(
            Arc::new(AuthSession::in_memory()),
            ApiClientOptions::builder()
                .base_url("https://api.test.local/api/v1")
                .build(),
        )
        .unwrap();
        assert_eq!(client.timeout, ClientConfig::global().timeout);
    }

    #[tokio::test]
    async fn auth_routes_get_no_authorization_header() {
        let client = client("https://api.test.local/api/v1");
        client
            .session()
            .set_auth_tokens(AuthTokens::new("access", "refresh"), false);
        let url = client.refresh_url().clone();
        let headers = client
            .prepare_headers(&ApiRequest::post(url.as_str()), &url)
            .await
            .unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), "en-US");
    }

    #[tokio::test]
    async fn caller_content_type_is_preserved() {
        let client = client("https://api.test.local/api/v1");
        let request = ApiRequest::post("/upload")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
        let url = join_path(client.base_url(), &request.path).unwrap();
        let headers = client.prepare_headers(&request, &url).await.unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/csv");
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn retry_context_token_wins_over_stored_token() {
        let client = client("https://api.test.local/api/v1");
        client
            .session()
            .set_auth_tokens(AuthTokens::new("stored", "refresh"), false);
        let request = ApiRequest::get("/users").into_retry("refreshed".to_string());
        let url = join_path(client.base_url(), &request.path).unwrap();
        let headers = client.prepare_headers(&request, &url).await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer refreshed");
    }
}
