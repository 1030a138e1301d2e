//! Login protocol configuration.
//!
//! Every field has a default matching the live EduPage service, so an empty
//! JSON object (`{}`) is a valid configuration. Overriding `base_url` points
//! the flow at another host, which is how the integration tests reach the
//! mock server.

use serde::Deserialize;

pub const DEFAULT_MARKER: &str = "csrfauth";
pub const DEFAULT_OFFSET: usize = 10;
pub const DEFAULT_TOKEN_LEN: usize = 72;
pub const DEFAULT_SESSION_COOKIE: &str = "PHPSESSID";

const LOGIN_PAGE_PATH: &str = "/login/index.php";
const LOGIN_SUBMIT_PATH: &str = "/login/edubarLogin.php";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Fixed origin for both endpoints. `None` derives it from the subdomain.
    pub base_url: Option<String>,
    pub marker: String,
    /// Distance from the marker's last byte to the token's first byte.
    pub offset: usize,
    pub token_len: usize,
    /// Byte that must follow the token, if any.
    pub terminator: Option<char>,
    pub session_cookie: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            marker: DEFAULT_MARKER.to_string(),
            offset: DEFAULT_OFFSET,
            token_len: DEFAULT_TOKEN_LEN,
            terminator: Some('"'),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }
}

impl LoginConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: Some(base_url.to_string()),
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Origin for `subdomain`, without a trailing slash.
    pub fn origin(&self, subdomain: &str) -> String {
        match &self.base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{subdomain}.edupage.org"),
        }
    }

    pub fn login_page_url(&self, subdomain: &str) -> String {
        format!("{}{LOGIN_PAGE_PATH}", self.origin(subdomain))
    }

    pub fn login_submit_url(&self, subdomain: &str) -> String {
        format!("{}{LOGIN_SUBMIT_PATH}", self.origin(subdomain))
    }

    /// Terminator as a byte. Non-ASCII terminators are ignored.
    pub(crate) fn terminator_byte(&self) -> Option<u8> {
        self.terminator.filter(char::is_ascii).map(|c| c as u8)
    }
}
