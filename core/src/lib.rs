//! Transport-agnostic login core for EduPage.
//!
//! # Overview
//! Logs in to `https://{subdomain}.edupage.org` in two requests: fetch the
//! login page and pull the CSRF token out of its body as it streams past,
//! then post the credentials together with that token. The HTTP engine is
//! supplied by the caller through the `Transport` trait, so the same flow
//! runs over the bundled ureq client, a C host behind the FFI crate, or a
//! scripted test double.
//!
//! # Design
//! - `StreamMatcher` finds the token without buffering the page; its state
//!   is bounded by the marker and token lengths.
//! - `Transport` pushes response headers and body chunks into a
//!   `ResponseSink` and returns the status code. Transport faults and HTTP
//!   error statuses stay distinct.
//! - `LoginFlow` sequences the two requests and owns the token for exactly
//!   one attempt; `Session` owns the transport and the resulting session id.

pub mod config;
pub mod error;
pub mod http;
pub mod login;
pub mod matcher;
pub mod session;
pub mod transport;
pub mod types;
#[cfg(feature = "ureq")]
pub mod ureq_transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::LoginConfig;
pub use error::{LoginError, MatchError, TransportError};
pub use http::{Header, HeaderList, HttpMethod, HttpRequest, StatusCode};
pub use login::{LoginFlow, LoginState, SessionGrant};
pub use matcher::{MatchEvent, StreamMatcher};
pub use session::Session;
pub use transport::{Discard, ResponseSink, Transport};
pub use types::{Credentials, CsrfToken};
#[cfg(feature = "ureq")]
pub use ureq_transport::UreqTransport;
