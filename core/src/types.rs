//! Domain values for the login protocol.
//!
//! # Design
//! Secrets (`password`, CSRF token) get hand-written `Debug` impls that never
//! print the value, so a stray `{:?}` in a log line cannot leak them.

use std::fmt;

use serde::Serialize;

use crate::error::LoginError;

/// Account credentials supplied by the caller.
#[derive(Clone)]
pub struct Credentials {
    pub subdomain: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        subdomain: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            subdomain: subdomain.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reject empty fields. Anything else is left to the remote service.
    pub fn validate(&self) -> Result<(), LoginError> {
        if self.subdomain.is_empty() {
            return Err(LoginError::EmptyCredential("subdomain"));
        }
        if self.username.is_empty() {
            return Err(LoginError::EmptyCredential("username"));
        }
        if self.password.is_empty() {
            return Err(LoginError::EmptyCredential("password"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("subdomain", &self.subdomain)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A captured CSRF token. Exists only for the duration of one login attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Wrap an already-extracted token value.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CsrfToken([REDACTED; {} bytes])", self.0.len())
    }
}

/// JSON body of the credential submission. Field order is wire order.
#[derive(Debug, Serialize)]
pub struct LoginPayload<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub csrfauth: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials::new("school", "alice", "hunter2");
        let printed = format!("{creds:?}");
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn credentials_validate_names_empty_field() {
        let err = Credentials::new("school", "", "pw").validate().unwrap_err();
        assert!(matches!(err, LoginError::EmptyCredential("username")));

        let err = Credentials::new("", "alice", "pw").validate().unwrap_err();
        assert!(matches!(err, LoginError::EmptyCredential("subdomain")));

        let err = Credentials::new("school", "alice", "").validate().unwrap_err();
        assert!(matches!(err, LoginError::EmptyCredential("password")));

        assert!(Credentials::new("school", "alice", "pw").validate().is_ok());
    }

    #[test]
    fn csrf_token_debug_hides_value() {
        let token = CsrfToken::new("s3cr3t".repeat(12));
        let printed = format!("{token:?}");
        assert!(!printed.contains("s3cr3t"));
        assert!(printed.contains("72 bytes"));
    }

    #[test]
    fn payload_serializes_in_wire_order() {
        let payload = LoginPayload {
            username: "alice",
            password: "pw",
            csrfauth: "tok",
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"username":"alice","password":"pw","csrfauth":"tok"}"#);
    }
}
