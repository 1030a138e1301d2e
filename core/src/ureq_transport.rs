//! Blocking `Transport` backed by a `ureq` agent.
//!
//! The agent is built with `http_status_as_error(false)` so 4xx/5xx
//! responses come back as data and the login flow decides what they mean.
//! Redirects are not followed: the service signals rejected credentials
//! through the `Location` of a 3xx, which the sink must see.
//! Bodies are streamed through a fixed buffer; the response is never read
//! into memory as a whole.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use tracing::{debug, warn};
use ureq::http::{Response, Uri};
use ureq::{Agent, Body};

use crate::error::TransportError;
use crate::http::{HeaderList, StatusCode};
use crate::transport::{ResponseSink, Transport};

const READ_CHUNK: usize = 8 * 1024;

pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Fail any exchange that takes longer than `timeout` end to end.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn get(
        &mut self,
        url: &str,
        headers: &HeaderList,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError> {
        debug!(url, "GET");
        let mut request = self.agent.get(url);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }
        let response = request.call().map_err(|e| map_error(e, url))?;
        stream_response(response, sink)
    }

    fn post(
        &mut self,
        url: &str,
        headers: &HeaderList,
        body: &str,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError> {
        debug!(url, body_len = body.len(), "POST");
        let mut request = self.agent.post(url);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }
        let response = request
            .send(body.as_bytes())
            .map_err(|e| map_error(e, url))?;
        stream_response(response, sink)
    }
}

fn stream_response(
    mut response: Response<Body>,
    sink: &mut dyn ResponseSink,
) -> Result<StatusCode, TransportError> {
    let status = response.status().as_u16();
    for (name, value) in response.headers() {
        match value.to_str() {
            Ok(value) => sink.on_header(name.as_str(), value),
            Err(_) => warn!(header = %name, "skipping non-ASCII header value"),
        }
    }

    let mut reader = response.body_mut().as_reader();
    let mut buf = [0u8; READ_CHUNK];
    let mut total = 0usize;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::TimedOut => return Err(TransportError::Timeout),
            Err(e) => return Err(TransportError::Io(e.to_string())),
        };
        total += n;
        sink.on_chunk(&buf[..n]);
    }
    debug!(status, bytes = total, "response drained");
    Ok(status)
}

fn map_error(err: ureq::Error, url: &str) -> TransportError {
    warn!(url, error = %err, "transport failure");
    match err {
        ureq::Error::HostNotFound => TransportError::Dns {
            host: host_of(url).unwrap_or_else(|| url.to_string()),
        },
        ureq::Error::ConnectionFailed => TransportError::Connect(err.to_string()),
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) => match e.kind() {
            ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => {
                TransportError::Connect(e.to_string())
            }
            ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Io(e.to_string()),
        },
        ureq::Error::BadUri(msg) => TransportError::InvalidRequest(msg),
        ureq::Error::Http(e) => TransportError::InvalidRequest(e.to_string()),
        other => TransportError::Protocol(other.to_string()),
    }
}

fn host_of(url: &str) -> Option<String> {
    let uri: Uri = url.parse().ok()?;
    uri.host().map(str::to_string)
}
