#![allow(dead_code)]

use std::sync::Arc;

use apatie_client::auth::{AuthSession, AuthTokens};
use apatie_client::client::{ApiClient, ApiClientOptions};
use chrono::{Duration, Utc};
use wiremock::{MockServer, Request};

pub const REFRESH_PATH: &str = "/api/auth/jwt/refresh/";
pub const LOGIN_PATH: &str = "/api/auth/jwt/create/";

pub fn api_base(server: &MockServer) -> String {
    format!("{}/api/v1", server.uri())
}

pub fn client_for(server: &MockServer, session: Arc<AuthSession>) -> ApiClient {
    ApiClient::new(
        session,
        ApiClientOptions::builder()
            .base_url(api_base(server))
            .language("fa")
            .build(),
    )
    .expect("build client")
}

/// Pair expiring `expires_in_secs` from now (negative for already expired).
pub fn tokens(access: &str, refresh: &str, expires_in_secs: i64) -> AuthTokens {
    AuthTokens::new(access, refresh).with_expires_at(Utc::now() + Duration::seconds(expires_in_secs))
}

pub fn session_with(tokens: AuthTokens) -> Arc<AuthSession> {
    let session = Arc::new(AuthSession::in_memory());
    session.update_auth_tokens(tokens, false);
    session
}

pub async fn requests_to(server: &MockServer, path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .into_iter()
        .filter(|request| request.url.path() == path)
        .collect()
}

pub fn authorization(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
