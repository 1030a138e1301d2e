//! C-ABI wrapper around `edupage-core`.
//!
//! # Overview
//! Lets a C host drive the EduPage login with its own HTTP engine. The host
//! fills an `FfiTransport` table; the core calls back into it for the token
//! GET and the credentials POST, and the host streams each response back
//! through `edupage_sink_header` / `edupage_sink_chunk` while the callback is
//! still running.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `edupage_login` returns an `FfiLoginResult` envelope with a code, an
//!   optional message and the rejecting HTTP status.
//! - The C caller owns all returned pointers and must call the matching
//!   `edupage_free_*` / `edupage_session_free` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use edupage_core::{Credentials, LoginConfig, Session};
use tracing::debug;

pub use types::*;

/// Borrow a NUL-terminated argument as UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn c_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, *mut FfiLoginResult> {
    if ptr.is_null() {
        return Err(FfiLoginResult::null_arg(name));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiLoginResult::invalid_utf8(name))
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Create a session driven by the host `transport`.
///
/// `base_url` may be null, in which case requests go to
/// `https://{subdomain}.edupage.org`. Returns null if either callback is
/// missing, `base_url` is not UTF-8, or an internal panic occurs. The caller
/// must free the returned pointer with `edupage_session_free`.
#[unsafe(no_mangle)]
pub extern "C" fn edupage_session_new(
    transport: FfiTransport,
    base_url: *const c_char,
) -> *mut FfiSession {
    catch_unwind(|| {
        let Some(transport) = HostTransport::new(transport) else {
            return std::ptr::null_mut();
        };
        let config = if base_url.is_null() {
            LoginConfig::default()
        } else {
            match unsafe { CStr::from_ptr(base_url) }.to_str() {
                Ok(url) => LoginConfig::with_base_url(url),
                Err(_) => return std::ptr::null_mut(),
            }
        };
        let session = Session::with_config(transport, config);
        Box::into_raw(Box::new(FfiSession { inner: session }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a session created by `edupage_session_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn edupage_session_free(session: *mut FfiSession) {
    if !session.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(session) });
        });
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

fn login(
    session: &mut FfiSession,
    subdomain: *const c_char,
    username: *const c_char,
    password: *const c_char,
) -> *mut FfiLoginResult {
    let args = unsafe {
        c_arg(subdomain, "subdomain").and_then(|s| {
            let u = c_arg(username, "username")?;
            let p = c_arg(password, "password")?;
            Ok((s, u, p))
        })
    };
    let (subdomain, username, password) = match args {
        Ok(args) => args,
        Err(result) => return result,
    };

    match session
        .inner
        .login(&Credentials::new(subdomain, username, password))
    {
        Ok(()) => FfiLoginResult::ok(),
        Err(err) => {
            debug!(error = %err, "edupage_login failed");
            FfiLoginResult::from_error(err)
        }
    }
}

/// Run the full login handshake on `session`.
///
/// Never returns null. The caller must free the result with
/// `edupage_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn edupage_login(
    session: *mut FfiSession,
    subdomain: *const c_char,
    username: *const c_char,
    password: *const c_char,
) -> *mut FfiLoginResult {
    catch_unwind(AssertUnwindSafe(|| {
        if session.is_null() {
            return FfiLoginResult::null_arg("session");
        }
        let session = unsafe { &mut *session };
        login(session, subdomain, username, password)
    }))
    .unwrap_or_else(|_| FfiLoginResult::panic("panic in edupage_login"))
}

/// Whether the last login succeeded. False for a null session.
#[unsafe(no_mangle)]
pub extern "C" fn edupage_session_is_authenticated(session: *const FfiSession) -> bool {
    catch_unwind(|| {
        if session.is_null() {
            return false;
        }
        unsafe { &*session }.inner.is_authenticated()
    })
    .unwrap_or(false)
}

/// Copy of the session id, or null when not authenticated.
///
/// The caller must free the returned string with `edupage_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn edupage_session_token(session: *const FfiSession) -> *mut c_char {
    catch_unwind(|| {
        if session.is_null() {
            return std::ptr::null_mut();
        }
        match unsafe { &*session }.inner.session_token() {
            Some(token) => CString::new(token)
                .map(CString::into_raw)
                .unwrap_or(std::ptr::null_mut()),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Forget the session id. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn edupage_session_logout(session: *mut FfiSession) {
    if !session.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            unsafe { &mut *session }.inner.logout();
        }));
    }
}

// ---------------------------------------------------------------------------
// Response sink
// ---------------------------------------------------------------------------

/// Deliver one response header to the core.
///
/// Only valid inside a transport callback, before the first body chunk.
/// Returns false if any argument is null or not UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn edupage_sink_header(
    sink: *mut FfiSink,
    key: *const c_char,
    value: *const c_char,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if sink.is_null() || key.is_null() || value.is_null() {
            return false;
        }
        let (Ok(key), Ok(value)) = (
            unsafe { CStr::from_ptr(key) }.to_str(),
            unsafe { CStr::from_ptr(value) }.to_str(),
        ) else {
            return false;
        };
        unsafe { &mut *sink }.inner.on_header(key, value);
        true
    }))
    .unwrap_or(false)
}

/// Deliver `len` body bytes at `data` to the core.
///
/// Only valid inside a transport callback. `data` may be null when `len` is 0.
#[unsafe(no_mangle)]
pub extern "C" fn edupage_sink_chunk(sink: *mut FfiSink, data: *const u8, len: usize) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if sink.is_null() || (data.is_null() && len > 0) {
            return false;
        }
        let chunk: &[u8] = if len == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(data, len) }
        };
        unsafe { &mut *sink }.inner.on_chunk(chunk);
        true
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiLoginResult` and its message. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn edupage_free_result(result: *mut FfiLoginResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.message.is_null() {
            drop(unsafe { CString::from_raw(result.message) });
        }
    });
}

/// Free a string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn edupage_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_void;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef01234567";

    /// Scripted host: replays one page and one submit outcome.
    struct Host {
        page: Vec<u8>,
        chunk: usize,
        get_status: i32,
        post_status: i32,
        post_cookie: Option<CString>,
        urls: Vec<String>,
        bodies: Vec<String>,
        cookies_sent: Vec<String>,
    }

    impl Host {
        fn new(token: &str) -> Self {
            let page = format!(
                "<html><form><input type=\"hidden\" name=\"csrfauth\" value=\"{token}\"></form></html>"
            );
            Self {
                page: page.into_bytes(),
                chunk: 7,
                get_status: 200,
                post_status: 200,
                post_cookie: Some(CString::new("PHPSESSID=granted; path=/").unwrap()),
                urls: Vec::new(),
                bodies: Vec::new(),
                cookies_sent: Vec::new(),
            }
        }

        fn transport(&mut self) -> FfiTransport {
            FfiTransport {
                user_data: self as *mut Host as *mut c_void,
                get: Some(host_get),
                post: Some(host_post),
            }
        }
    }

    fn record(host: &mut Host, url: *const c_char, headers: *const FfiHeader, len: u32) {
        host.urls
            .push(unsafe { CStr::from_ptr(url) }.to_str().unwrap().to_string());
        if len == 0 {
            return;
        }
        let headers = unsafe { std::slice::from_raw_parts(headers, len as usize) };
        for h in headers {
            let key = unsafe { CStr::from_ptr(h.key) }.to_str().unwrap();
            if key.eq_ignore_ascii_case("cookie") {
                let value = unsafe { CStr::from_ptr(h.value) }.to_str().unwrap();
                host.cookies_sent.push(value.to_string());
            }
        }
    }

    extern "C" fn host_get(
        user_data: *mut c_void,
        url: *const c_char,
        headers: *const FfiHeader,
        headers_len: u32,
        sink: *mut FfiSink,
    ) -> i32 {
        let host = unsafe { &mut *(user_data as *mut Host) };
        record(host, url, headers, headers_len);
        edupage_sink_header(sink, c"Set-Cookie".as_ptr(), c"PHPSESSID=anon; path=/".as_ptr());
        for part in host.page.chunks(host.chunk) {
            assert!(edupage_sink_chunk(sink, part.as_ptr(), part.len()));
        }
        host.get_status
    }

    extern "C" fn host_post(
        user_data: *mut c_void,
        url: *const c_char,
        headers: *const FfiHeader,
        headers_len: u32,
        body: *const c_char,
        sink: *mut FfiSink,
    ) -> i32 {
        let host = unsafe { &mut *(user_data as *mut Host) };
        record(host, url, headers, headers_len);
        host.bodies
            .push(unsafe { CStr::from_ptr(body) }.to_str().unwrap().to_string());
        if let Some(cookie) = &host.post_cookie {
            edupage_sink_header(sink, c"Set-Cookie".as_ptr(), cookie.as_ptr());
        }
        host.post_status
    }

    extern "C" fn host_refuses(
        _user_data: *mut c_void,
        _url: *const c_char,
        _headers: *const FfiHeader,
        _headers_len: u32,
        _sink: *mut FfiSink,
    ) -> i32 {
        FfiTransportStatus::ConnectFailed as i32
    }

    fn run_login(session: *mut FfiSession, user: &CStr, pass: &CStr) -> (FfiLoginCode, u16) {
        let result = edupage_login(session, c"school".as_ptr(), user.as_ptr(), pass.as_ptr());
        assert!(!result.is_null());
        let out = unsafe { ((*result).code, (*result).http_status) };
        edupage_free_result(result);
        out
    }

    #[test]
    fn login_through_host_callbacks() {
        let mut host = Host::new(TOKEN);
        let session = edupage_session_new(host.transport(), std::ptr::null());
        assert!(!session.is_null());

        let (code, _) = run_login(session, c"alice", c"hunter2");
        assert_eq!(code, FfiLoginCode::Ok);
        assert!(edupage_session_is_authenticated(session));

        let token = edupage_session_token(session);
        assert_eq!(unsafe { CStr::from_ptr(token) }.to_str().unwrap(), "granted");
        edupage_free_string(token);

        assert_eq!(
            host.urls,
            vec![
                "https://school.edupage.org/login/index.php",
                "https://school.edupage.org/login/edubarLogin.php",
            ]
        );
        assert_eq!(host.cookies_sent, vec!["PHPSESSID=anon"]);
        let body: serde_json::Value = serde_json::from_str(&host.bodies[0]).unwrap();
        assert_eq!(body["csrfauth"], TOKEN);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["password"], "hunter2");

        edupage_session_logout(session);
        assert!(!edupage_session_is_authenticated(session));
        assert!(edupage_session_token(session).is_null());
        edupage_session_free(session);
    }

    #[test]
    fn rejected_credentials_carry_status() {
        let mut host = Host::new(TOKEN);
        host.post_status = 403;
        host.post_cookie = None;
        let session = edupage_session_new(host.transport(), c"http://127.0.0.1:9".as_ptr());

        let (code, status) = run_login(session, c"alice", c"wrong");
        assert_eq!(code, FfiLoginCode::CredentialsRejected);
        assert_eq!(status, 403);
        assert!(!edupage_session_is_authenticated(session));
        assert_eq!(host.urls[0], "http://127.0.0.1:9/login/index.php");
        edupage_session_free(session);
    }

    #[test]
    fn page_without_token_is_token_unavailable() {
        let mut host = Host::new(TOKEN);
        host.page = b"<html>maintenance</html>".to_vec();
        let session = edupage_session_new(host.transport(), std::ptr::null());

        let (code, _) = run_login(session, c"alice", c"hunter2");
        assert_eq!(code, FfiLoginCode::TokenUnavailable);
        assert_eq!(host.urls.len(), 1);
        edupage_session_free(session);
    }

    #[test]
    fn host_fault_is_transport_error() {
        let mut host = Host::new(TOKEN);
        let mut transport = host.transport();
        transport.get = Some(host_refuses);
        let session = edupage_session_new(transport, std::ptr::null());

        let (code, _) = run_login(session, c"alice", c"hunter2");
        assert_eq!(code, FfiLoginCode::Transport);
        edupage_session_free(session);
    }

    #[test]
    fn empty_password_is_reported() {
        let mut host = Host::new(TOKEN);
        let session = edupage_session_new(host.transport(), std::ptr::null());
        let (code, _) = run_login(session, c"alice", c"");
        assert_eq!(code, FfiLoginCode::EmptyCredential);
        assert!(host.urls.is_empty());
        edupage_session_free(session);
    }

    #[test]
    fn null_arguments_are_reported() {
        let result = edupage_login(
            std::ptr::null_mut(),
            c"school".as_ptr(),
            c"alice".as_ptr(),
            c"pw".as_ptr(),
        );
        assert_eq!(unsafe { (*result).code }, FfiLoginCode::NullArg);
        edupage_free_result(result);

        let mut host = Host::new(TOKEN);
        let session = edupage_session_new(host.transport(), std::ptr::null());
        let result = edupage_login(
            session,
            c"school".as_ptr(),
            std::ptr::null(),
            c"pw".as_ptr(),
        );
        let message = unsafe { CStr::from_ptr((*result).message) };
        assert_eq!(unsafe { (*result).code }, FfiLoginCode::NullArg);
        assert!(message.to_str().unwrap().contains("username"));
        edupage_free_result(result);
        edupage_session_free(session);
    }

    #[test]
    fn missing_callbacks_reject_session() {
        let transport = FfiTransport {
            user_data: std::ptr::null_mut(),
            get: Some(host_refuses),
            post: None,
        };
        assert!(edupage_session_new(transport, std::ptr::null()).is_null());
    }

    #[test]
    fn null_handles_are_tolerated() {
        assert!(!edupage_session_is_authenticated(std::ptr::null()));
        assert!(edupage_session_token(std::ptr::null()).is_null());
        edupage_session_logout(std::ptr::null_mut());
        edupage_session_free(std::ptr::null_mut());
        edupage_free_result(std::ptr::null_mut());
        edupage_free_string(std::ptr::null_mut());
        assert!(!edupage_sink_chunk(std::ptr::null_mut(), std::ptr::null(), 0));
        assert!(!edupage_sink_header(
            std::ptr::null_mut(),
            c"k".as_ptr(),
            c"v".as_ptr()
        ));
    }
}
