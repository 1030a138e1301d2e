//! The capability a host must provide to run the login flow.
//!
//! # Design
//! A `Transport` performs one HTTP exchange and pushes the response into a
//! caller-supplied `ResponseSink` as it arrives: headers of the final
//! response first, then body chunks in receive order. The call returns the
//! status code only after the last chunk, and nothing reaches the sink once
//! it has returned.
//!
//! HTTP-level failures (4xx/5xx) are `Ok(status)`. `Err(TransportError)` is
//! reserved for exchanges that never produced a response.

use crate::error::TransportError;
use crate::http::{HeaderList, HttpMethod, HttpRequest, StatusCode};

/// Receiver for a streamed response.
///
/// Chunks are borrowed for the duration of the call only; copy anything
/// that must outlive it.
pub trait ResponseSink {
    fn on_header(&mut self, _name: &str, _value: &str) {}

    fn on_chunk(&mut self, chunk: &[u8]);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl ResponseSink for Discard {
    fn on_chunk(&mut self, _chunk: &[u8]) {}
}

pub trait Transport {
    fn get(
        &mut self,
        url: &str,
        headers: &HeaderList,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError>;

    fn post(
        &mut self,
        url: &str,
        headers: &HeaderList,
        body: &str,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError>;

    /// Execute a prepared request through `get` or `post`.
    fn execute(
        &mut self,
        request: &HttpRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError> {
        match request.method {
            HttpMethod::Get => self.get(&request.url, &request.headers, sink),
            HttpMethod::Post => {
                let body = request.body.as_deref().unwrap_or("");
                self.post(&request.url, &request.headers, body, sink)
            }
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(
        &mut self,
        url: &str,
        headers: &HeaderList,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError> {
        (**self).get(url, headers, sink)
    }

    fn post(
        &mut self,
        url: &str,
        headers: &HeaderList,
        body: &str,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError> {
        (**self).post(url, headers, body, sink)
    }
}
