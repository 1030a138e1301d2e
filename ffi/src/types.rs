//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! The host's HTTP engine enters the core as `FfiTransport`, a table of two
//! function pointers plus an opaque `user_data` pointer, the same shape a C
//! library would use for a pluggable request backend. `HostTransport` adapts
//! that table to the core `Transport` trait. Results go back out through the
//! heap-allocated `FfiLoginResult` envelope.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use edupage_core::{
    HeaderList, LoginError, ResponseSink, Session, StatusCode, Transport, TransportError,
};

/// A single header as borrowed C strings, valid for the callback's duration.
#[repr(C)]
pub struct FfiHeader {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// Opaque handle through which the host delivers a response.
///
/// Only valid while the `get`/`post` callback that received it is running.
pub struct FfiSink<'a> {
    pub(crate) inner: &'a mut dyn ResponseSink,
}

/// Host GET callback. Returns the HTTP status (100..=999) or an
/// `FfiTransportStatus` code (< 0). The host must not follow redirects: a
/// rejected login is only visible as the `Location` of the 3xx.
pub type FfiGetFn = extern "C" fn(
    user_data: *mut c_void,
    url: *const c_char,
    headers: *const FfiHeader,
    headers_len: u32,
    sink: *mut FfiSink,
) -> i32;

/// Host POST callback. `body` is a NUL-terminated UTF-8 string.
pub type FfiPostFn = extern "C" fn(
    user_data: *mut c_void,
    url: *const c_char,
    headers: *const FfiHeader,
    headers_len: u32,
    body: *const c_char,
    sink: *mut FfiSink,
) -> i32;

/// Function table supplied by the host.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfiTransport {
    pub user_data: *mut c_void,
    pub get: Option<FfiGetFn>,
    pub post: Option<FfiPostFn>,
}

/// Negative return codes a host callback may use to report a fault.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiTransportStatus {
    ConnectFailed = -1,
    DnsFailed = -2,
    Timeout = -3,
    Cancelled = -4,
    Io = -5,
}

// ---------------------------------------------------------------------------
// Host transport adapter
// ---------------------------------------------------------------------------

pub struct HostTransport {
    raw: FfiTransport,
}

impl HostTransport {
    pub(crate) fn new(raw: FfiTransport) -> Option<Self> {
        if raw.get.is_none() || raw.post.is_none() {
            return None;
        }
        Some(Self { raw })
    }
}

/// Owned C copies of a header list, kept alive across one callback.
struct CHeaders {
    _owned: Vec<(CString, CString)>,
    raw: Vec<FfiHeader>,
}

impl CHeaders {
    fn new(headers: &HeaderList) -> Result<Self, TransportError> {
        let owned = headers
            .iter()
            .map(|(k, v)| Ok((c_string(k)?, c_string(v)?)))
            .collect::<Result<Vec<_>, TransportError>>()?;
        let raw = owned
            .iter()
            .map(|(k, v)| FfiHeader {
                key: k.as_ptr(),
                value: v.as_ptr(),
            })
            .collect();
        Ok(Self { _owned: owned, raw })
    }

    fn as_ptr(&self) -> *const FfiHeader {
        if self.raw.is_empty() {
            std::ptr::null()
        } else {
            self.raw.as_ptr()
        }
    }

    fn len(&self) -> u32 {
        self.raw.len() as u32
    }
}

fn c_string(s: &str) -> Result<CString, TransportError> {
    CString::new(s).map_err(|_| TransportError::InvalidRequest(format!("NUL byte in {s:?}")))
}

/// Translate a host callback's return value.
pub(crate) fn status_from_code(code: i32) -> Result<StatusCode, TransportError> {
    match code {
        100..=999 => Ok(code as StatusCode),
        -1 => Err(TransportError::Connect("host reported connection failure".to_string())),
        -2 => Err(TransportError::Dns {
            host: "unknown".to_string(),
        }),
        -3 => Err(TransportError::Timeout),
        -4 => Err(TransportError::Cancelled),
        c if c < 0 => Err(TransportError::Io(format!("host transport error {c}"))),
        c => Err(TransportError::Protocol(format!("invalid status code {c}"))),
    }
}

impl Transport for HostTransport {
    fn get(
        &mut self,
        url: &str,
        headers: &HeaderList,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError> {
        let get = self
            .raw
            .get
            .ok_or_else(|| TransportError::InvalidRequest("no get callback".to_string()))?;
        let url = c_string(url)?;
        let headers = CHeaders::new(headers)?;
        let mut ffi_sink = FfiSink { inner: sink };
        let code = get(
            self.raw.user_data,
            url.as_ptr(),
            headers.as_ptr(),
            headers.len(),
            &mut ffi_sink,
        );
        status_from_code(code)
    }

    fn post(
        &mut self,
        url: &str,
        headers: &HeaderList,
        body: &str,
        sink: &mut dyn ResponseSink,
    ) -> Result<StatusCode, TransportError> {
        let post = self
            .raw
            .post
            .ok_or_else(|| TransportError::InvalidRequest("no post callback".to_string()))?;
        let url = c_string(url)?;
        let body = c_string(body)?;
        let headers = CHeaders::new(headers)?;
        let mut ffi_sink = FfiSink { inner: sink };
        let code = post(
            self.raw.user_data,
            url.as_ptr(),
            headers.as_ptr(),
            headers.len(),
            body.as_ptr(),
            &mut ffi_sink,
        );
        status_from_code(code)
    }
}

/// Opaque handle to a `Session` driven by a host transport. C callers
/// receive a pointer to this and pass it back into every FFI function.
pub struct FfiSession {
    pub(crate) inner: Session<HostTransport>,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Outcome codes returned in `FfiLoginResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiLoginCode {
    Ok = 0,
    NullArg = 1,
    InvalidUtf8 = 2,
    EmptyCredential = 3,
    Transport = 4,
    TokenUnavailable = 5,
    CredentialsRejected = 6,
    SessionUnavailable = 7,
    Serialization = 8,
    Panic = 9,
    NotLoggedIn = 10,
}

/// Result envelope for `edupage_login`.
///
/// On success `code` is `Ok` and `message` is null. On failure `message` is
/// a human-readable C string and `http_status` carries the rejecting status
/// where one exists.
#[repr(C)]
pub struct FfiLoginResult {
    pub code: FfiLoginCode,
    pub message: *mut c_char,
    pub http_status: u16,
}

impl FfiLoginResult {
    fn boxed(code: FfiLoginCode, message: Option<String>, http_status: u16) -> *mut Self {
        let message = match message {
            Some(m) => CString::new(m).unwrap_or_default().into_raw(),
            None => std::ptr::null_mut(),
        };
        Box::into_raw(Box::new(FfiLoginResult {
            code,
            message,
            http_status,
        }))
    }

    pub(crate) fn ok() -> *mut Self {
        Self::boxed(FfiLoginCode::Ok, None, 0)
    }

    pub(crate) fn from_error(err: LoginError) -> *mut Self {
        let (code, status) = match &err {
            LoginError::EmptyCredential(_) => (FfiLoginCode::EmptyCredential, 0),
            LoginError::Transport(_) => (FfiLoginCode::Transport, 0),
            LoginError::TokenUnavailable => (FfiLoginCode::TokenUnavailable, 0),
            LoginError::CredentialsRejected { status } => {
                (FfiLoginCode::CredentialsRejected, *status)
            }
            LoginError::SessionUnavailable => (FfiLoginCode::SessionUnavailable, 0),
            LoginError::NotLoggedIn => (FfiLoginCode::NotLoggedIn, 0),
            LoginError::Serialization(_) => (FfiLoginCode::Serialization, 0),
        };
        Self::boxed(code, Some(err.to_string()), status)
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(FfiLoginCode::NullArg, Some(format!("null argument: {name}")), 0)
    }

    pub(crate) fn invalid_utf8(name: &str) -> *mut Self {
        Self::boxed(
            FfiLoginCode::InvalidUtf8,
            Some(format!("argument is not UTF-8: {name}")),
            0,
        )
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiLoginCode::Panic, Some(msg.to_string()), 0)
    }
}
