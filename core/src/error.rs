//! Error types for the login core.
//!
//! # Design
//! Transport faults and application-level outcomes are kept structurally
//! apart: a `TransportError` means no HTTP response was observed at all,
//! while 4xx/5xx statuses travel as ordinary status codes and are only turned
//! into `LoginError` variants by the login flow. `MatchError` never leaves the
//! core as-is; the flow folds it into `TokenUnavailable`.

use thiserror::Error;

/// Faults raised by a `Transport` before a complete response was observed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The host name could not be resolved.
    #[error("DNS lookup failed for {host}")]
    Dns { host: String },

    /// The TCP/TLS connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The request was cancelled by the transport's owner.
    #[error("request cancelled")]
    Cancelled,

    /// Reading or writing the socket failed mid-exchange.
    #[error("I/O error: {0}")]
    Io(String),

    /// The peer spoke something that is not valid HTTP.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The request could not be formed (bad URL, illegal header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Malformed input detected by the `StreamMatcher` after the marker was found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The value continues past the declared token length.
    #[error("token value exceeds {token_len} bytes")]
    Overrun { token_len: usize },

    /// The terminator appeared before the declared token length was reached.
    #[error("token value ended after {captured} bytes")]
    Truncated { captured: usize },

    /// The captured bytes are not valid UTF-8.
    #[error("token value is not valid UTF-8")]
    InvalidUtf8,
}

/// Outcome of a failed login attempt.
#[derive(Debug, Error)]
pub enum LoginError {
    /// A credential field was empty.
    #[error("{0} must not be empty")]
    EmptyCredential(&'static str),

    /// The transport failed before a response was observed.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The login page was not a 200, or carried no usable CSRF token.
    #[error("CSRF token unavailable")]
    TokenUnavailable,

    /// The service answered the credential submission with a rejection.
    #[error("credentials rejected (HTTP {status})")]
    CredentialsRejected { status: u16 },

    /// The service accepted the login but never issued a session cookie.
    #[error("no session identifier was issued")]
    SessionUnavailable,

    /// A request needing an authenticated session was made without one.
    #[error("session is not logged in")]
    NotLoggedIn,

    /// The credential payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
