//! Cookie mirror of the access token
//!
//! Route-level checks on the server side read the access token from a cookie
//! rather than from the `Authorization` header. The mirror holds that cookie.
//! It is written on every save and expired on every clear, and is never read
//! back as the source of truth.

use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Cookie name carrying the mirrored access token
pub const ACCESS_TOKEN_COOKIE: &str = "admin_access_token";

/// Lifetime of the cookie when the user asked to be remembered
pub const REMEMBERED_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// A rendered cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    /// `None` is a session cookie; `Some(0)` deletes the cookie
    pub max_age: Option<Duration>,
    pub same_site: String,
}

impl MirrorCookie {
    fn access_token(value: &str, max_age: Option<Duration>) -> Self {
        Self {
            name: ACCESS_TOKEN_COOKIE.to_string(),
            value: value.to_string(),
            path: "/".to_string(),
            max_age,
            same_site: "Strict".to_string(),
        }
    }

    /// Whether this cookie instructs the user agent to drop it
    pub fn is_expired(&self) -> bool {
        self.max_age.is_some_and(|age| age.is_zero())
    }

    /// `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        self.to_string()
    }

    /// Copy safe to print: attributes kept, token value masked
    #[must_use]
    pub fn redacted(&self) -> Self {
        let value = if self.value.is_empty() {
            String::new()
        } else {
            "<redacted>".to_string()
        };
        Self {
            value,
            ..self.clone()
        }
    }
}

impl fmt::Display for MirrorCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.as_secs())?;
        }
        write!(f, "; SameSite={}", self.same_site)
    }
}

/// Holder of the mirrored cookie
#[derive(Debug, Default)]
pub struct CookieMirror {
    current: RwLock<Option<MirrorCookie>>,
}

impl CookieMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the cookie with a fresh access token
    pub fn set(&self, access_token: &str, remember: bool) {
        let max_age = remember.then_some(REMEMBERED_MAX_AGE);
        self.replace(MirrorCookie::access_token(access_token, max_age));
    }

    /// Replace the cookie with its expiring form
    pub fn expire(&self) {
        self.replace(MirrorCookie::access_token("", Some(Duration::ZERO)));
    }

    /// The cookie as last written, expired or not
    pub fn current(&self) -> Option<MirrorCookie> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mirrored access token, if the cookie is live
    pub fn access_token(&self) -> Option<String> {
        self.current()
            .filter(|cookie| !cookie.is_expired() && !cookie.value.is_empty())
            .map(|cookie| cookie.value)
    }

    fn replace(&self, cookie: MirrorCookie) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(cookie);
    }
}
