//! Base URL joining and token endpoint resolution.

use reqwest::Url;

use crate::error::{ClientError, Result};

/// Refresh endpoint, relative to the API base.
pub const REFRESH_PATH: &str = "../auth/jwt/refresh/";
/// Login endpoint, relative to the API base.
pub const LOGIN_PATH: &str = "../auth/jwt/create/";

const AUTH_ROUTE_MARKER: &str = "auth/jwt";

pub fn ensure_trailing_slash(value: &str) -> String {
    if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    }
}

/// Resolve `relative` against `base` treated as a directory.
///
/// `https://api.test.local/api/v1` and `https://api.test.local/api/v1/`
/// both resolve [`REFRESH_PATH`] to `https://api.test.local/api/auth/jwt/refresh/`.
pub fn resolve_endpoint(base: &str, relative: &str) -> Result<Url> {
    let base = parse_base(base)?;
    base.join(relative)
        .map_err(|err| ClientError::Configuration(format!("invalid endpoint '{relative}': {err}")))
}

/// Join a request path onto the base URL. Absolute URLs pass through.
pub fn join_path(base: &str, path: &str) -> Result<Url> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Url::parse(path)
            .map_err(|err| ClientError::InvalidArgument(format!("invalid URL '{path}': {err}")));
    }
    let joined = if path.is_empty() {
        base.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };
    Url::parse(&joined)
        .map_err(|err| ClientError::InvalidArgument(format!("invalid URL '{joined}': {err}")))
}

/// Token endpoints never carry credentials and never trigger a refresh.
pub fn is_auth_route(url: &Url) -> bool {
    url.path().contains(AUTH_ROUTE_MARKER)
}

fn parse_base(base: &str) -> Result<Url> {
    let url = Url::parse(&ensure_trailing_slash(base))
        .map_err(|err| ClientError::Configuration(format!("invalid base URL '{base}': {err}")))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Configuration(format!(
            "base URL '{base}' cannot have relative paths"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_endpoint_handles_trailing_slash() {
        let expected = "https://api.test.local/api/auth/jwt/refresh/";
        assert_eq!(
            resolve_endpoint("https://api.test.local/api/v1", REFRESH_PATH)
                .unwrap()
                .as_str(),
            expected
        );
        assert_eq!(
            resolve_endpoint("https://api.test.local/api/v1/", REFRESH_PATH)
                .unwrap()
                .as_str(),
            expected
        );
    }

    #[test]
    fn login_endpoint_sits_next_to_refresh() {
        let url = resolve_endpoint("http://localhost:8000/api/v1", LOGIN_PATH).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/auth/jwt/create/");
        assert!(is_auth_route(&url));
    }

    #[test]
    fn invalid_base_is_a_configuration_error() {
        let err = resolve_endpoint("not a url", REFRESH_PATH).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn join_path_normalizes_slashes() {
        let base = "https://api.test.local/api/v1/";
        assert_eq!(
            join_path(base, "/users").unwrap().as_str(),
            "https://api.test.local/api/v1/users"
        );
        assert_eq!(
            join_path("https://api.test.local/api/v1", "users/?page=2")
                .unwrap()
                .as_str(),
            "https://api.test.local/api/v1/users/?page=2"
        );
    }

    #[test]
    fn join_path_keeps_absolute_urls() {
        let url = join_path("https://api.test.local/api/v1", "https://other.local/x").unwrap();
        assert_eq!(url.as_str(), "https://other.local/x");
    }

    #[test]
    fn ordinary_routes_are_not_auth_routes() {
        let url = join_path("https://api.test.local/api/v1", "/users").unwrap();
        assert!(!is_auth_route(&url));
    }
}
