//! The two-request login handshake.
//!
//! # Design
//! `LoginFlow` first fetches the login page and streams it through a
//! `StreamMatcher` to capture the CSRF token, then posts the credentials with
//! that token as JSON. The requests themselves come from the public
//! `build_*` methods, so a host that cannot implement `Transport` can still
//! drive the exchange by hand.
//!
//! The token lives on the stack of a single `run` call and is dropped on
//! every exit path. Nothing here retries; the first failure is returned.

use tracing::{debug, warn};

use crate::config::LoginConfig;
use crate::error::LoginError;
use crate::http::{set_cookie_value, HttpRequest, StatusCode};
use crate::matcher::StreamMatcher;
use crate::transport::{ResponseSink, Transport};
use crate::types::{Credentials, CsrfToken, LoginPayload};

/// Query fragment the service appends to its redirect on bad credentials.
const REJECTION_MARKER: &str = "bad=1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Start,
    TokenRequested,
    TokenAcquired,
    CredentialsSubmitted,
    Authenticated,
    Failed,
}

/// What a successful login hands back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub subdomain: String,
    pub session_id: String,
}

pub struct LoginFlow<'a> {
    config: &'a LoginConfig,
    state: LoginState,
}

impl<'a> LoginFlow<'a> {
    pub fn new(config: &'a LoginConfig) -> Self {
        Self {
            config,
            state: LoginState::Start,
        }
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn build_token_request(&self, subdomain: &str) -> HttpRequest {
        HttpRequest::get(self.config.login_page_url(subdomain))
    }

    /// Credential POST. `session_id` is the cookie issued with the login
    /// page, echoed back so the token is checked against the same session.
    pub fn build_credentials_request(
        &self,
        credentials: &Credentials,
        token: &CsrfToken,
        session_id: Option<&str>,
    ) -> Result<HttpRequest, LoginError> {
        let payload = LoginPayload {
            username: &credentials.username,
            password: &credentials.password,
            csrfauth: token.as_str(),
        };
        let body = serde_json::to_string(&payload)?;

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(id) = session_id {
            headers.push((
                "Cookie".to_string(),
                format!("{}={id}", self.config.session_cookie),
            ));
        }
        Ok(HttpRequest::post(
            self.config.login_submit_url(&credentials.subdomain),
            headers,
            body,
        ))
    }

    pub fn run<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        credentials: &Credentials,
    ) -> Result<SessionGrant, LoginError> {
        match self.attempt(transport, credentials) {
            Ok(grant) => {
                self.transition(LoginState::Authenticated);
                Ok(grant)
            }
            Err(err) => {
                self.transition(LoginState::Failed);
                warn!(subdomain = %credentials.subdomain, error = %err, "login failed");
                Err(err)
            }
        }
    }

    fn attempt<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        credentials: &Credentials,
    ) -> Result<SessionGrant, LoginError> {
        credentials.validate()?;

        self.transition(LoginState::TokenRequested);
        let request = self.build_token_request(&credentials.subdomain);
        let mut page = LoginPageSink::new(self.config);
        let status = transport.execute(&request, &mut page)?;
        let (token, page_session) = page.finish(status)?;

        self.transition(LoginState::TokenAcquired);
        let request =
            self.build_credentials_request(credentials, &token, page_session.as_deref())?;
        drop(token);

        self.transition(LoginState::CredentialsSubmitted);
        let mut reply = SubmitSink::new(&self.config.session_cookie);
        let status = transport.execute(&request, &mut reply)?;
        // A rejection arrives as a redirect to `?bad=1`; any other redirect
        // is the service sending a logged-in user on.
        if reply
            .location
            .as_deref()
            .is_some_and(|l| l.contains(REJECTION_MARKER))
        {
            return Err(LoginError::CredentialsRejected { status });
        }
        if !(200..400).contains(&status) {
            return Err(LoginError::CredentialsRejected { status });
        }

        let session_id = reply
            .session_id
            .or(page_session)
            .ok_or(LoginError::SessionUnavailable)?;
        Ok(SessionGrant {
            subdomain: credentials.subdomain.clone(),
            session_id,
        })
    }

    fn transition(&mut self, next: LoginState) {
        debug!(from = ?self.state, to = ?next, "login state");
        self.state = next;
    }
}

/// Feeds the login page into the matcher and remembers the session cookie.
struct LoginPageSink<'a> {
    matcher: StreamMatcher,
    cookie: &'a str,
    session_id: Option<String>,
}

impl<'a> LoginPageSink<'a> {
    fn new(config: &'a LoginConfig) -> Self {
        Self {
            matcher: StreamMatcher::from_config(config),
            cookie: &config.session_cookie,
            session_id: None,
        }
    }

    fn finish(self, status: StatusCode) -> Result<(CsrfToken, Option<String>), LoginError> {
        if status != 200 {
            debug!(status, "login page not served");
            return Err(LoginError::TokenUnavailable);
        }
        match self.matcher.finish() {
            Ok(Some(token)) => Ok((token, self.session_id)),
            Ok(None) => {
                debug!("login page carried no token");
                Err(LoginError::TokenUnavailable)
            }
            Err(err) => {
                debug!(error = %err, "malformed token on login page");
                Err(LoginError::TokenUnavailable)
            }
        }
    }
}

impl ResponseSink for LoginPageSink<'_> {
    fn on_header(&mut self, name: &str, value: &str) {
        capture_cookie(self.cookie, &mut self.session_id, name, value);
    }

    fn on_chunk(&mut self, chunk: &[u8]) {
        self.matcher.on_chunk(chunk);
    }
}

/// Reads only the headers of the credential reply; the body is discarded.
struct SubmitSink<'a> {
    cookie: &'a str,
    session_id: Option<String>,
    location: Option<String>,
}

impl<'a> SubmitSink<'a> {
    fn new(cookie: &'a str) -> Self {
        Self {
            cookie,
            session_id: None,
            location: None,
        }
    }
}

impl ResponseSink for SubmitSink<'_> {
    fn on_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("location") {
            self.location = Some(value.to_string());
        }
        capture_cookie(self.cookie, &mut self.session_id, name, value);
    }

    fn on_chunk(&mut self, _chunk: &[u8]) {}
}

fn capture_cookie(cookie: &str, slot: &mut Option<String>, name: &str, value: &str) {
    if name.eq_ignore_ascii_case("set-cookie") {
        if let Some(id) = set_cookie_value(value, cookie) {
            *slot = Some(id.to_string());
        }
    }
}
