//! HTTP Basic authentication
//!
//! Every lifecycle request carries `Authorization: Basic <credentials>`.
//! Verification is constant-time over both username and password so the
//! comparison leaks nothing about how far a guess got.

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use subtle::ConstantTimeEq;

use super::errors::ApiError;

/// The credential pair every request is checked against.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        let user_ok = self.username.as_bytes().ct_eq(username.as_bytes());
        let pass_ok = self.password.as_bytes().ct_eq(password.as_bytes());
        bool::from(user_ok & pass_ok)
    }
}

/// Encode a pair as an `Authorization` header value.
pub fn basic_header_value(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{}:{}", username, password))
    )
}

/// Reject the request unless it presents the expected Basic credentials.
pub fn require_basic_auth(
    headers: &HeaderMap,
    expected: &BasicCredentials,
) -> Result<(), ApiError> {
    let header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let encoded = header.strip_prefix("Basic ").ok_or(ApiError::Unauthorized)?;
    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|_| ApiError::Unauthorized)?;
    let decoded = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;
    let (username, password) = decoded.split_once(':').ok_or(ApiError::Unauthorized)?;

    if expected.matches(username, password) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    fn expected() -> BasicCredentials {
        BasicCredentials::new("broker", "s3cret")
    }

    #[test]
    fn test_valid_credentials_pass() {
        let headers = headers_with(&basic_header_value("broker", "s3cret"));
        assert!(require_basic_auth(&headers, &expected()).is_ok());
    }

    #[test]
    fn test_wrong_password_rejected() {
        let headers = headers_with(&basic_header_value("broker", "guess"));
        assert!(require_basic_auth(&headers, &expected()).is_err());
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(require_basic_auth(&HeaderMap::new(), &expected()).is_err());
    }

    #[test]
    fn test_non_basic_scheme_rejected() {
        let headers = headers_with("Bearer some-token");
        assert!(require_basic_auth(&headers, &expected()).is_err());
    }

    #[test]
    fn test_malformed_base64_rejected() {
        let headers = headers_with("Basic ???not-base64???");
        assert!(require_basic_auth(&headers, &expected()).is_err());
    }
}
