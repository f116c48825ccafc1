//! Session state and the login/logout flows.
//!
//! The server hands out its session token as a cookie on login and expects
//! it back on every request. [`SessionManager`] is the only place that knows
//! this: it captures the cookie, attaches it to outgoing requests and drops
//! it when the server expires or rejects it.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::{CimiError, Result};
use crate::operations::{decode_body, error_body, error_message, ResourceEngine};
use crate::transport::HttpResponse;
use crate::value::Value;

/// Template href for username/password authentication.
pub const INTERNAL_SESSION_TEMPLATE: &str = "session-template/internal";

/// Authentication state of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

#[derive(Default)]
struct Session {
    /// Session cookies by name, in the order the server set them.
    cookies: IndexMap<String, String>,
    /// Resource id of the session, e.g. `session/4b2c...`.
    resource_id: Option<String>,
}

/// Owns the session token and its attachment to requests.
///
/// State transitions are guarded by a lock, so a manager can be shared
/// between tasks.
#[derive(Default)]
pub struct SessionManager {
    session: RwLock<Session>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.session.read();
        f.debug_struct("SessionManager")
            .field("authenticated", &!session.cookies.is_empty())
            .field("resource_id", &session.resource_id)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.session.read().cookies.is_empty() {
            SessionState::Unauthenticated
        } else {
            SessionState::Authenticated
        }
    }

    /// Local check; never contacts the server.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Resource id of the current session, if the server reported one.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session.read().resource_id.clone()
    }

    /// Add the session cookie to an outgoing request.
    pub(crate) fn attach(&self, headers: &mut HeaderMap) {
        let session = self.session.read();
        if session.cookies.is_empty() {
            return;
        }

        let cookie = session
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => tracing::warn!("session cookie is not a valid header value, not attached"),
        }
    }

    /// Capture the session from a successful login response.
    pub(crate) fn establish(&self, response: &HttpResponse, body: &Value) -> Result<()> {
        let cookies: IndexMap<String, String> = set_cookies(&response.headers)
            .filter(|cookie| !cookie.is_expired())
            .map(|cookie| (cookie.name, cookie.value))
            .collect();

        if cookies.is_empty() {
            return Err(CimiError::AuthenticationFailed {
                status: response.status.as_u16(),
                message: "login response did not carry a session cookie".to_string(),
                body: Some(body.clone()),
            });
        }

        let mut session = self.session.write();
        session.cookies = cookies;
        session.resource_id = body.get_str("resource-id").map(str::to_string);
        tracing::info!(session = ?session.resource_id, "session established");
        Ok(())
    }

    /// Track cookie refreshes, expirations and rejections on any response.
    pub(crate) fn observe(&self, response: &HttpResponse) {
        let mut session = self.session.write();
        if session.cookies.is_empty() {
            return;
        }

        for cookie in set_cookies(&response.headers) {
            if !session.cookies.contains_key(&cookie.name) {
                continue;
            }
            if cookie.is_expired() {
                let _ = session.cookies.shift_remove(&cookie.name);
            } else {
                session.cookies.insert(cookie.name, cookie.value);
            }
        }

        if response.status == StatusCode::UNAUTHORIZED {
            tracing::warn!("server rejected the session, dropping it");
            session.cookies.clear();
        }

        if session.cookies.is_empty() {
            session.resource_id = None;
        }
    }

    /// Forget the session locally.
    pub(crate) fn clear(&self) {
        let mut session = self.session.write();
        session.cookies.clear();
        session.resource_id = None;
    }
}

/// Build the `session-template/internal` login parameters.
#[must_use]
pub fn internal_login(username: &str, password: &str) -> Value {
    Value::mapping([
        ("href", INTERNAL_SESSION_TEMPLATE),
        ("username", username),
        ("password", password),
    ])
}

/// Create a session by posting `{"sessionTemplate": params}` to `url`.
pub(crate) async fn login(engine: &ResourceEngine, url: Url, params: &Value) -> Result<Value> {
    let body = Value::mapping([("sessionTemplate", params.clone())]);
    // A rejected login must not disturb an existing session, so the
    // response bypasses session observation.
    let response = engine
        .dispatch(Method::POST, url, Some(&body), None)
        .await?;

    if response.status.is_success() {
        let document = decode_body(&response.body)?;
        engine.session().establish(&response, &document)?;
        return Ok(document);
    }

    let status = response.status.as_u16();
    let body = error_body(&response.body);
    let message = error_message(body.as_ref(), response.status);

    if response.status.is_client_error() {
        tracing::debug!(status, "login rejected");
        return Err(CimiError::AuthenticationFailed {
            status,
            message,
            body,
        });
    }

    Err(CimiError::ServerRejected {
        status,
        message,
        body,
    })
}

/// Delete the current session.
///
/// Without a locally known session the server is asked which session the
/// caller holds (the sessions collection only lists the caller's own); the
/// first one reported is deleted. Returns `Null` when there is none.
pub(crate) async fn logout(
    engine: &ResourceEngine,
    base_uri: &Url,
    sessions_url: Url,
) -> Result<Value> {
    let session_id = match engine.session().session_id() {
        Some(id) => Some(id),
        None => find_session_id(engine, sessions_url).await?,
    };

    let Some(session_id) = session_id else {
        engine.session().clear();
        return Ok(Value::Null);
    };

    let url = base_uri.join(&session_id)?;
    match engine.execute(Method::DELETE, url, None, None).await {
        Ok(document) => {
            engine.session().clear();
            Ok(document)
        }
        Err(err) => {
            if matches!(err.status_code(), Some(401 | 404)) {
                engine.session().clear();
            }
            Err(err)
        }
    }
}

async fn find_session_id(engine: &ResourceEngine, sessions_url: Url) -> Result<Option<String>> {
    let document = engine.execute(Method::GET, sessions_url, None, None).await?;
    let id = document
        .get("sessions")
        .and_then(Value::as_sequence)
        .and_then(|sessions| sessions.first())
        .and_then(|session| session.get_str("id"))
        .map(str::to_string);
    Ok(id)
}

struct SetCookie {
    name: String,
    value: String,
    max_age: Option<i64>,
    expires: Option<DateTime<Utc>>,
}

impl SetCookie {
    fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            max_age: None,
            expires: None,
        };

        for attribute in parts {
            let Some((key, val)) = attribute.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.eq_ignore_ascii_case("max-age") {
                cookie.max_age = val.trim().parse().ok();
            } else if key.eq_ignore_ascii_case("expires") {
                cookie.expires = parse_expires(val.trim());
            }
        }

        Some(cookie)
    }

    fn is_expired(&self) -> bool {
        if self.value.is_empty() {
            return true;
        }
        if let Some(max_age) = self.max_age {
            return max_age <= 0;
        }
        self.expires.is_some_and(|at| at <= Utc::now())
    }
}

/// Cookie dates seen in the wild besides RFC 2822.
const EXPIRES_FORMATS: &[&str] = &[
    "%a, %d-%b-%Y %H:%M:%S GMT",
    "%A, %d-%b-%y %H:%M:%S GMT",
    "%a %b %e %H:%M:%S %Y",
];

fn parse_expires(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    EXPIRES_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn set_cookies(headers: &HeaderMap) -> impl Iterator<Item = SetCookie> + '_ {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(SetCookie::parse)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const COOKIE_NAME: &str = "com.sixsq.slipstream.cookie";

    fn response(status: u16, set_cookie: &[&str]) -> HttpResponse {
        let mut headers = HeaderMap::new();
        for value in set_cookie {
            headers.append(SET_COOKIE, HeaderValue::from_str(value).unwrap());
        }
        HttpResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            body: String::new(),
        }
    }

    fn login_body() -> Value {
        Value::mapping([("status", Value::from(201)), ("resource-id", "session/abc".into())])
    }

    fn authenticated() -> SessionManager {
        let manager = SessionManager::new();
        manager
            .establish(
                &response(201, &[&format!("{COOKIE_NAME}=token=abc; Path=/")]),
                &login_body(),
            )
            .unwrap();
        manager
    }

    fn cookie_header(manager: &SessionManager) -> Option<String> {
        let mut headers = HeaderMap::new();
        manager.attach(&mut headers);
        headers
            .get(COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn test_new_manager_is_unauthenticated() {
        let manager = SessionManager::new();
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(cookie_header(&manager).is_none());
    }

    #[test]
    fn test_establish_captures_cookie_and_session_id() {
        let manager = authenticated();
        assert!(manager.is_authenticated());
        assert_eq!(manager.session_id().as_deref(), Some("session/abc"));
        assert_eq!(
            cookie_header(&manager).as_deref(),
            Some("com.sixsq.slipstream.cookie=token=abc")
        );
    }

    #[test]
    fn test_establish_without_cookie_fails() {
        let manager = SessionManager::new();
        let err = manager
            .establish(&response(201, &[]), &login_body())
            .unwrap_err();
        assert!(matches!(err, CimiError::AuthenticationFailed { status: 201, .. }));
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_expired_cookie_clears_session() {
        let manager = authenticated();
        manager.observe(&response(200, &[&format!("{COOKIE_NAME}=; Max-Age=0; Path=/")]));
        assert!(!manager.is_authenticated());
        assert!(manager.session_id().is_none());
    }

    #[test]
    fn test_past_expires_attribute_clears_session() {
        let manager = authenticated();
        manager.observe(&response(
            200,
            &[&format!("{COOKIE_NAME}=token=abc; Expires=Thu, 01 Jan 1970 00:00:00 GMT")],
        ));
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_past_dashed_expires_attribute_clears_session() {
        let manager = authenticated();
        manager.observe(&response(
            200,
            &[&format!("{COOKIE_NAME}=token=abc; Path=/; Expires=Thu, 01-Jan-1970 00:00:00 GMT")],
        ));
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_parse_expires_formats() {
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_expires("Thu, 01 Jan 1970 00:00:00 GMT"), Some(epoch));
        assert_eq!(parse_expires("Thu, 01-Jan-1970 00:00:00 GMT"), Some(epoch));
        assert_eq!(parse_expires("Thursday, 01-Jan-70 00:00:00 GMT"), Some(epoch));
        assert_eq!(parse_expires("Thu Jan  1 00:00:00 1970"), Some(epoch));
        assert_eq!(parse_expires("tomorrow"), None);

        let future = parse_expires("Fri, 31-Dec-2100 23:59:59 GMT").unwrap();
        assert!(future > Utc::now());
    }

    #[test]
    fn test_refreshed_cookie_replaces_token() {
        let manager = authenticated();
        manager.observe(&response(200, &[&format!("{COOKIE_NAME}=token=def; Path=/")]));
        assert_eq!(
            cookie_header(&manager).as_deref(),
            Some("com.sixsq.slipstream.cookie=token=def")
        );
    }

    #[test]
    fn test_unrelated_cookie_is_ignored() {
        let manager = authenticated();
        manager.observe(&response(200, &["tracking=xyz; Path=/"]));
        assert_eq!(
            cookie_header(&manager).as_deref(),
            Some("com.sixsq.slipstream.cookie=token=abc")
        );
    }

    #[test]
    fn test_unauthorized_response_drops_session() {
        let manager = authenticated();
        manager.observe(&response(401, &[]));
        assert_eq!(manager.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_forbidden_response_keeps_session() {
        let manager = authenticated();
        manager.observe(&response(403, &[]));
        assert!(manager.is_authenticated());
    }

    #[test]
    fn test_debug_hides_token() {
        let manager = authenticated();
        let debug = format!("{manager:?}");
        assert!(debug.contains("authenticated: true"));
        assert!(!debug.contains("token=abc"));
    }

    #[test]
    fn test_internal_login_template() {
        let params = internal_login("u", "p");
        assert_eq!(params.get_str("href"), Some(INTERNAL_SESSION_TEMPLATE));
        assert_eq!(params.get_str("username"), Some("u"));
        assert_eq!(params.get_str("password"), Some("p"));
    }
}
