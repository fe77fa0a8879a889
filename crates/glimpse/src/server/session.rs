//! Cookie-based session flags.
//!
//! Signing in stores `token → email` in memory and hands the client a cookie
//! holding the token plus a keyed BLAKE3 MAC. Cookies whose MAC does not
//! verify are treated as absent. Each email holds at most one session, so a
//! new signin invalidates the previous cookie and the map never outgrows the
//! account table. Sessions never expire on their own and do not survive a
//! restart.

use std::collections::HashMap;
use std::sync::RwLock;

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use glimpse_core::config::SessionConfig;

/// Context string for deriving the cookie MAC key from the configured secret.
const KEY_CONTEXT: &str = "glimpse 2024-06-01 session cookie mac";

/// Random bytes per session token.
const TOKEN_BYTES: usize = 32;

/// Server-side record of signed-in emails.
pub struct SessionStore {
    key: [u8; 32],
    cookie_name: String,
    sessions: RwLock<HashMap<String, String>>,
}

impl SessionStore {
    /// Create an empty store keyed from the session secret.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, config.secret.as_bytes()),
            cookie_name: config.cookie_name.clone(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Record `email` as signed in and return the `Set-Cookie` value.
    ///
    /// Any earlier session for the same email is dropped.
    pub fn sign_in(&self, email: &str) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let mut sessions = self.write();
        sessions.retain(|_, signed_in| signed_in != email);
        sessions.insert(token.clone(), email.to_string());
        drop(sessions);

        format!(
            "{}={}.{}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name,
            token,
            self.mac(&token)
        )
    }

    /// Clear the session named by the request cookie, if any, and return the
    /// expiring `Set-Cookie` value along with the email that was signed in.
    pub fn sign_out(&self, headers: &HeaderMap) -> (String, Option<String>) {
        let email = self
            .token_from(headers)
            .and_then(|token| self.write().remove(&token));
        let cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        );
        (cookie, email)
    }

    /// Email of the signed-in user for this request, if any.
    pub fn current_user(&self, headers: &HeaderMap) -> Option<String> {
        let token = self.token_from(headers)?;
        self.read().get(&token).cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    fn mac(&self, token: &str) -> String {
        blake3::keyed_hash(&self.key, token.as_bytes())
            .to_hex()
            .to_string()
    }

    /// Extract and verify the session token from the `Cookie` headers.
    fn token_from(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)?;

        let (token, mac) = value.rsplit_once('.')?;
        let provided = blake3::Hash::from_hex(mac).ok()?;
        // blake3::Hash equality is constant-time
        if provided == blake3::keyed_hash(&self.key, token.as_bytes()) {
            Some(token.to_string())
        } else {
            tracing::debug!("Ignoring session cookie with invalid signature");
            None
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, String>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn store() -> SessionStore {
        SessionStore::new(&SessionConfig::default())
    }

    /// Turn a `Set-Cookie` value into the request `Cookie` header a browser sends.
    fn request_headers(set_cookie: &str) -> HeaderMap {
        let pair = set_cookie.split(';').next().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(pair).unwrap());
        headers
    }

    #[test]
    fn test_sign_in_then_current_user() {
        let store = store();
        let cookie = store.sign_in("ada@example.com");
        assert!(cookie.starts_with("glimpse_session="));
        assert!(cookie.contains("HttpOnly"));

        let headers = request_headers(&cookie);
        assert_eq!(store.current_user(&headers).as_deref(), Some("ada@example.com"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sign_out_clears_session() {
        let store = store();
        let headers = request_headers(&store.sign_in("ada@example.com"));

        let (expired, email) = store.sign_out(&headers);
        assert_eq!(email.as_deref(), Some("ada@example.com"));
        assert!(expired.contains("Max-Age=0"));
        assert_eq!(store.current_user(&headers), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_repeat_sign_in_replaces_session() {
        let store = store();
        let first = request_headers(&store.sign_in("ada@example.com"));
        let second = request_headers(&store.sign_in("ada@example.com"));
        store.sign_in("grace@example.com");

        assert_eq!(store.len(), 2);
        assert_eq!(store.current_user(&first), None);
        assert_eq!(store.current_user(&second).as_deref(), Some("ada@example.com"));

        for _ in 0..50 {
            store.sign_in("ada@example.com");
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_sign_out_without_cookie() {
        let store = store();
        let (expired, email) = store.sign_out(&HeaderMap::new());
        assert!(email.is_none());
        assert!(expired.starts_with("glimpse_session=;"));
    }

    #[test]
    fn test_tampered_cookie_ignored() {
        let store = store();
        let cookie = store.sign_in("ada@example.com");
        let pair = cookie.split(';').next().unwrap();
        let (prefix, _) = pair.rsplit_once('.').unwrap();
        let forged = format!("{prefix}.{}", "0".repeat(64));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&forged).unwrap());
        assert_eq!(store.current_user(&headers), None);
    }

    #[test]
    fn test_cookie_from_other_secret_rejected() {
        let ours = store();
        let theirs = SessionStore::new(&SessionConfig {
            secret: "a-different-secret".into(),
            ..SessionConfig::default()
        });
        let headers = request_headers(&theirs.sign_in("eve@example.com"));
        assert_eq!(ours.current_user(&headers), None);
    }

    #[test]
    fn test_finds_cookie_among_others() {
        let store = store();
        let cookie = store.sign_in("ada@example.com");
        let pair = cookie.split(';').next().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {pair}; lang=en")).unwrap(),
        );
        assert_eq!(store.current_user(&headers).as_deref(), Some("ada@example.com"));
    }
}
