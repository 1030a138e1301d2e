//! Scripted transport for unit tests.

use std::collections::VecDeque;

use crate::error::TransportError;
use crate::http::{HeaderList, HttpMethod, HttpRequest, StatusCode};
use crate::transport::{ResponseSink, Transport};

pub(crate) struct Scripted {
    pub result: Result<StatusCode, TransportError>,
    pub headers: HeaderList,
    pub chunks: Vec<Vec<u8>>,
}

impl Scripted {
    pub fn ok(status: StatusCode) -> Self {
        Self {
            result: Ok(status),
            headers: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn fail(err: TransportError) -> Self {
        Self {
            result: Err(err),
            headers: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.chunks.push(body.as_bytes().to_vec());
        self
    }

    pub fn chunks(mut self, parts: &[&[u8]]) -> Self {
        self.chunks.extend(parts.iter().map(|p| p.to_vec()));
        self
    }
}

/// Replays scripted responses in order and records every request.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    pub responses: VecDeque<Scripted>,
    pub requests: Vec<HttpRequest>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            responses: responses.into(),
            requests: Vec::new(),
        }
    }

    fn replay(
        &mut self,
        request: HttpRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError> {
        self.requests.push(request);
        let scripted = self
            .responses
            .pop_front()
            .expect("no scripted response left");
        if scripted.result.is_ok() {
            for (name, value) in &scripted.headers {
                sink.on_header(name, value);
            }
            for chunk in &scripted.chunks {
                sink.on_chunk(chunk);
            }
        }
        scripted.result
    }
}

impl Transport for ScriptedTransport {
    fn get(
        &mut self,
        url: &str,
        headers: &HeaderList,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError> {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: headers.clone(),
            body: None,
        };
        self.replay(request, sink)
    }

    fn post(
        &mut self,
        url: &str,
        headers: &HeaderList,
        body: &str,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError> {
        let request = HttpRequest::post(url, headers.clone(), body.to_string());
        self.replay(request, sink)
    }
}

/// 72-byte token used across the unit tests.
pub(crate) const TOKEN: &str =
    "ZYXWVUTSRQPONMLKJIHGFEDCBAzyxwvutsrqponmlkjihgfedcba98765432100123456789";

/// Login page laid out like the live service.
pub(crate) fn login_page(token: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body><form method=\"post\">\
         <input type=\"hidden\" name=\"csrfauth\" value=\"{token}\">\
         </form></body></html>"
    )
}
