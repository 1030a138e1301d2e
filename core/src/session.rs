//! An EduPage session bound to one transport.
//!
//! # Design
//! The transport is injected at construction and owned for the session's
//! lifetime. Authentication state is a single `Option`, so a session id
//! exists exactly when the session is authenticated.

use tracing::info;

use crate::config::LoginConfig;
use crate::error::LoginError;
use crate::http::{HttpRequest, StatusCode};
use crate::login::{LoginFlow, SessionGrant};
use crate::transport::{ResponseSink, Transport};
use crate::types::Credentials;

#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    config: LoginConfig,
    auth: Option<SessionGrant>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, LoginConfig::default())
    }

    pub fn with_config(transport: T, config: LoginConfig) -> Self {
        Self {
            transport,
            config,
            auth: None,
        }
    }

    /// Run the login handshake.
    ///
    /// Any earlier authentication is dropped first: the login page hands
    /// out a fresh server session, so a failed attempt leaves the session
    /// logged out.
    pub fn login(&mut self, credentials: &Credentials) -> Result<(), LoginError> {
        self.auth = None;
        let grant = LoginFlow::new(&self.config).run(&mut self.transport, credentials)?;
        info!(subdomain = %grant.subdomain, "logged in");
        self.auth = Some(grant);
        Ok(())
    }

    pub fn logout(&mut self) {
        self.auth = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Session identifier issued by the service, if logged in.
    pub fn session_token(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.session_id.as_str())
    }

    pub fn subdomain(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.subdomain.as_str())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` with the session cookie appended to its headers.
    pub fn send(
        &mut self,
        request: &HttpRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, LoginError> {
        let auth = self.auth.as_ref().ok_or(LoginError::NotLoggedIn)?;
        let mut request = request.clone();
        request.headers.push((
            "Cookie".to_string(),
            format!("{}={}", self.config.session_cookie, auth.session_id),
        ));
        Ok(self.transport.execute(&request, sink)?)
    }
}
