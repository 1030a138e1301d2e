use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "PHPSESSID";
pub const TOKEN_LEN: usize = 72;
/// Where the service sends a browser after a failed login.
pub const REJECTED_LOCATION: &str = "/login/?bad=1";

/// Filler placed ahead of the token so the page spans several reads.
const PAGE_PADDING: usize = 24 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub csrfauth: String,
}

#[derive(Default)]
pub struct Store {
    accounts: HashMap<String, String>,
    /// Issued CSRF token -> session it was issued to.
    tokens: HashMap<String, String>,
    sessions: HashSet<String>,
}

impl Store {
    pub fn is_logged_in(&self, session: &str) -> bool {
        self.sessions.contains(session)
    }

    pub fn outstanding_tokens(&self) -> usize {
        self.tokens.len()
    }

    /// Issue a token to `session`, revoking any it was issued before.
    fn issue_for(&mut self, session: &str) -> String {
        self.tokens.retain(|_, owner| owner.as_str() != session);
        let token = issue_token();
        self.tokens.insert(token.clone(), session.to_string());
        token
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Router with a single account, `alice` / `hunter2`.
pub fn app() -> Router {
    app_with_accounts([("alice", "hunter2")])
}

pub fn app_with_accounts<'a>(accounts: impl IntoIterator<Item = (&'a str, &'a str)>) -> Router {
    let store = Store {
        accounts: accounts
            .into_iter()
            .map(|(u, p)| (u.to_string(), p.to_string()))
            .collect(),
        ..Store::default()
    };
    router(Arc::new(RwLock::new(store)))
}

pub fn router(db: Db) -> Router {
    Router::new()
        .route("/login/", get(login_page))
        .route("/login/index.php", get(login_page))
        .route("/login/edubarLogin.php", post(submit_login))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock EduPage listening");
    }
    axum::serve(listener, app()).await
}

/// 72 random hex characters.
pub fn issue_token() -> String {
    let mut token = String::with_capacity(TOKEN_LEN);
    while token.len() < TOKEN_LEN {
        token.push_str(&Uuid::new_v4().simple().to_string());
    }
    token.truncate(TOKEN_LEN);
    token
}

pub fn render_login_page(token: &str) -> String {
    let filler = "<!-- edubar -->\n".repeat(PAGE_PADDING / 16);
    format!(
        "<!DOCTYPE html>\n<html><head><title>EduPage</title></head><body>\n{filler}\
         <form method=\"post\" action=\"/login/edubarLogin.php\">\n\
         <input type=\"hidden\" name=\"csrfauth\" value=\"{token}\">\n\
         <input type=\"text\" name=\"username\"><input type=\"password\" name=\"password\">\n\
         </form>\n</body></html>\n"
    )
}

fn session_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == SESSION_COOKIE)
        .map(|(_, v)| v.to_string())
}

fn set_session(session: &str) -> (header::HeaderName, String) {
    (
        header::SET_COOKIE,
        format!("{SESSION_COOKIE}={session}; path=/; HttpOnly"),
    )
}

async fn login_page(State(db): State<Db>, headers: HeaderMap) -> Response {
    let session = session_from(&headers).unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let token = db.write().await.issue_for(&session);
    debug!("issued login token");
    ([set_session(&session)], Html(render_login_page(&token))).into_response()
}

async fn submit_login(
    State(db): State<Db>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(input) = match payload {
        Ok(p) => p,
        Err(rejection) => return rejection.into_response(),
    };

    let mut store = db.write().await;
    let Some(bound_session) = store.tokens.remove(&input.csrfauth) else {
        return (StatusCode::BAD_REQUEST, "unknown csrfauth").into_response();
    };
    if session_from(&headers).is_some_and(|s| s != bound_session) {
        return (StatusCode::BAD_REQUEST, "csrfauth issued to another session").into_response();
    }
    if store.accounts.get(&input.username) != Some(&input.password) {
        info!(username = %input.username, "rejected login");
        return (StatusCode::FOUND, [(header::LOCATION, REJECTED_LOCATION)]).into_response();
    }

    // Rotate the session on privilege change.
    let session = Uuid::new_v4().simple().to_string();
    store.sessions.insert(session.clone());
    info!(username = %input.username, "login accepted");
    ([set_session(&session)], "OK").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_are_72_hex_chars() {
        let token = issue_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, issue_token());
    }

    #[test]
    fn page_places_token_ten_bytes_past_marker_end() {
        let token = issue_token();
        let page = render_login_page(&token);
        let marker_last = page.find("csrfauth").unwrap() + "csrfauth".len() - 1;
        assert_eq!(&page[marker_last + 10..marker_last + 10 + TOKEN_LEN], token);
        assert_eq!(&page[marker_last + 10 + TOKEN_LEN..][..1], "\"");
        assert!(page.len() > PAGE_PADDING);
    }

    #[test]
    fn reissuing_to_a_session_revokes_its_old_token() {
        let mut store = Store::default();
        let first = store.issue_for("s1");
        store.issue_for("s2");
        let second = store.issue_for("s1");
        assert_ne!(first, second);
        assert_eq!(store.outstanding_tokens(), 2);
        assert!(!store.tokens.contains_key(&first));
        assert_eq!(store.tokens.get(&second).map(String::as_str), Some("s1"));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "a=1; PHPSESSID=abc; b=2".parse().unwrap());
        assert_eq!(session_from(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn login_request_rejects_missing_token() {
        let result: Result<LoginRequest, _> =
            serde_json::from_str(r#"{"username":"a","password":"b"}"#);
        assert!(result.is_err());
    }
}
