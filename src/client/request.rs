//! Request and response values passed through the client pipeline.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// A request against the API, relative to the client's base URL.
///
/// Carries its own retry context: a request resubmitted after a refresh is
/// marked retried and holds the refreshed access token.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    retried: bool,
    refreshed_access_token: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
            refreshed_access_token: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a JSON body.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Whether this request is already the retry after a refresh.
    pub fn is_retry(&self) -> bool {
        self.retried
    }

    pub(crate) fn refreshed_access_token(&self) -> Option<&str> {
        self.refreshed_access_token.as_deref()
    }

    pub(crate) fn into_retry(mut self, access_token: String) -> Self {
        self.retried = true;
        self.refreshed_access_token = Some(access_token);
        self
    }
}

/// A successful (2xx) response with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::CONTENT_TYPE;
    use serde_json::json;

    #[test]
    fn builder_collects_parts() {
        let request = ApiRequest::post("/services")
            .with_query("page", "2")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_json(&json!({ "name": "cut" }))
            .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.query, vec![("page".to_string(), "2".to_string())]);
        assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(request.body, Some(json!({ "name": "cut" })));
        assert!(!request.is_retry());
    }

    #[test]
    fn retry_context_carries_refreshed_token() {
        let retry = ApiRequest::get("/users").into_retry("next-access".to_string());
        assert!(retry.is_retry());
        assert_eq!(retry.refreshed_access_token(), Some("next-access"));
    }

    #[test]
    fn response_decodes_json() {
        let response = ApiResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            br#"{"data":["ok"]}"#.to_vec(),
        );
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["data"][0], "ok");
        assert_eq!(response.text(), r#"{"data":["ok"]}"#);
    }
}
