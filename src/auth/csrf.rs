//! Anti-forgery tokens for state-changing requests.
//!
//! Enforcement only applies when it is enabled AND the request claims a
//! session. A request without a session cookie cannot have received a token,
//! so it is not held to the CSRF rules. Safe methods (GET, HEAD, OPTIONS)
//! never change state and are never checked.

use axum::http::Method;
use subtle::ConstantTimeEq;
use tracing::debug;

use super::token::random_token;
use crate::gateway::RequestClaims;
use crate::prelude::*;
use crate::session::Session;

/// Header carrying the token in both directions.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

#[derive(Debug, Clone, Copy)]
pub struct CsrfGuard {
    enabled: bool,
}

impl CsrfGuard {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether tokens should be issued at all.
    pub fn can_issue_token(&self) -> bool {
        self.enabled
    }

    /// Returns the session's token, generating one if it has none.
    pub fn issue_token(&self, session: &mut Session) -> String {
        session.csrf_token.get_or_insert_with(random_token).clone()
    }

    /// Replaces the session's token with a fresh one.
    pub fn refresh_token(&self, session: &mut Session) -> String {
        let token = random_token();
        session.csrf_token = Some(token.clone());
        token
    }

    /// Checks the token supplied with `request` against the one stored in the
    /// claimed `session`.
    ///
    /// Fails with [`Error::InvalidCsrfToken`] whether the token is missing,
    /// wrong, or the claimed session has no record; callers cannot tell the
    /// cases apart.
    pub fn validate(&self, request: &RequestClaims, session: Option<&Session>) -> Result<()> {
        if !self.enabled || request.session_id.is_none() || is_safe(&request.method) {
            return Ok(());
        }

        let stored = session.and_then(|s| s.csrf_token.as_deref());
        match (stored, request.csrf_token.as_deref()) {
            (Some(stored), Some(supplied))
                if bool::from(stored.as_bytes().ct_eq(supplied.as_bytes())) =>
            {
                Ok(())
            }
            _ => {
                debug!("Rejecting {} with mismatched CSRF token", request.method);
                Err(Error::InvalidCsrfToken)
            }
        }
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
