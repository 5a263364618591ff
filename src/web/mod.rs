//! HTTP surface of the gateway.
//!
//! [`mw_session::mw_session_reviver`] runs for every request and leaves a
//! [`ctx::Ctx`] in the request extensions. Route groups that touch the backing
//! store add [`permit_roles!`](crate::permit_roles) to bind a role for the
//! handler.

use axum::http::{HeaderMap, Method};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies, Key};

use crate::auth::csrf::CSRF_HEADER;
use crate::gateway::{RequestClaims, SessionGateway};

pub mod ctx;
pub mod error;
pub mod mw_role;
pub mod mw_session;
pub mod routes;

/// The signed session cookie.
#[derive(Clone)]
pub struct SessionCookie {
    name: String,
    key: Key,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, key: Key) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    /// Session id from the cookie. A cookie with a bad signature counts as
    /// absent.
    pub fn session_id(&self, cookies: &Cookies) -> Option<String> {
        cookies
            .signed(&self.key)
            .get(&self.name)
            .map(|cookie| cookie.value().to_string())
    }

    pub fn set(&self, cookies: &Cookies, session_id: &str) {
        let cookie = Cookie::build((self.name.clone(), session_id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        cookies.signed(&self.key).add(cookie);
    }

    pub fn remove(&self, cookies: &Cookies) {
        let cookie = Cookie::build((self.name.clone(), "")).path("/").build();
        cookies.signed(&self.key).remove(cookie);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: SessionGateway,
    pub cookie: SessionCookie,
    pub create_unconditionally: bool,
}

impl AppState {
    pub fn new(gateway: SessionGateway, cookie: SessionCookie) -> Self {
        Self {
            gateway,
            cookie,
            create_unconditionally: false,
        }
    }

    pub fn create_unconditionally(mut self, enabled: bool) -> Self {
        self.create_unconditionally = enabled;
        self
    }

    fn claims(&self, cookies: &Cookies, method: &Method, headers: &HeaderMap) -> RequestClaims {
        RequestClaims {
            method: method.clone(),
            session_id: self.cookie.session_id(cookies),
            csrf_token: headers
                .get(CSRF_HEADER)
                .and_then(|h| h.to_str().ok())
                .map(String::from),
        }
    }
}
