//! The per-request session pipeline.
//!
//! [`SessionGateway`] composes the CSRF guard, session store, directory
//! authenticator and role selector into the operations route handlers use:
//! [`revive_session`](SessionGateway::revive_session),
//! [`login`](SessionGateway::login),
//! [`select_role`](SessionGateway::select_role) and
//! [`logout`](SessionGateway::logout).
//!
//! Within one request the CSRF check always runs before anything that
//! authenticates or writes a session, and a role is only bound once the
//! identity is known. Any failing step ends the pipeline.

use std::sync::Arc;

use axum::http::Method;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::csrf::CsrfGuard;
use crate::auth::directory::DirectoryAuthenticator;
use crate::auth::identity::Identity;
use crate::db::contributor::Contributor;
use crate::prelude::*;
use crate::role::selector::{RoleBinding, RoleSelector};
use crate::session::{Session, SessionStore};

/// What the pipeline needs to know about an inbound request.
#[derive(Debug, Clone)]
pub struct RequestClaims {
    pub method: Method,
    /// Session id carried by the session cookie, if any.
    pub session_id: Option<String>,
    /// Token supplied in the CSRF header, if any.
    pub csrf_token: Option<String>,
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"REDACTED")
            .finish()
    }
}

/// Result of reviving the session a request claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revival {
    /// No session cookie; the request continues anonymously.
    NoSession,
    /// A session id was claimed but the store has no such record.
    Stale,
    Revived(Session),
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub identity: Identity,
    pub contributor: Contributor,
    /// Fresh CSRF token, present when enforcement is on.
    pub csrf_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub session: Session,
    pub csrf_token: Option<String>,
    /// Whether the session was created by this request.
    pub created: bool,
}

/// Both outcomes are successes; logout never fails for a missing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    ResetContent { session_destroyed: bool },
    SessionNotFound,
}

#[derive(Clone)]
pub struct SessionGateway {
    csrf: CsrfGuard,
    sessions: Arc<dyn SessionStore>,
    authenticator: DirectoryAuthenticator,
    roles: RoleSelector,
}

impl SessionGateway {
    pub fn new(
        csrf: CsrfGuard,
        sessions: Arc<dyn SessionStore>,
        authenticator: DirectoryAuthenticator,
        roles: RoleSelector,
    ) -> Self {
        Self {
            csrf,
            sessions,
            authenticator,
            roles,
        }
    }

    pub fn csrf(&self) -> &CsrfGuard {
        &self.csrf
    }

    /// Reattaches the session a request claims.
    ///
    /// Requests without a session cookie skip the session machinery entirely.
    /// Otherwise the stored record is read, the CSRF token is checked against
    /// it, and the stored identity is trusted as is.
    ///
    /// A claim the store has no record of is void: no token can have been
    /// issued for it, so the request is treated as sessionless and comes back
    /// as [`Revival::Stale`] without a CSRF check.
    pub async fn revive_session(&self, request: &RequestClaims) -> Result<Revival> {
        let Some(session_id) = request.session_id.as_deref() else {
            return Ok(Revival::NoSession);
        };
        let Some(session) = self.sessions.load(session_id).await? else {
            return Ok(Revival::Stale);
        };

        self.csrf.validate(request, Some(&session))?;
        debug!(
            "Revived {} session",
            if session.is_anonymous() { "anonymous" } else { "authenticated" }
        );
        Ok(Revival::Revived(session))
    }

    /// Makes sure the request has a persisted session, creating one when it
    /// claims none, and issues a CSRF token for it when enforcement is on.
    pub async fn establish_session(&self, revival: Revival) -> Result<EstablishedSession> {
        let (mut session, created) = match revival {
            Revival::Revived(session) => (session, false),
            Revival::NoSession | Revival::Stale => (self.sessions.create().await?, true),
        };

        let csrf_token = if self.csrf.can_issue_token() {
            let had_token = session.csrf_token.is_some();
            let token = self.csrf.issue_token(&mut session);
            if !had_token {
                self.sessions.save(&session).await?;
            }
            Some(token)
        } else {
            None
        };

        Ok(EstablishedSession {
            session,
            csrf_token,
            created,
        })
    }

    /// Logs a requestor in.
    ///
    /// The CSRF check runs first against the claimed session, if the store
    /// still has it. That session is resumed, or a new one started, but nothing is written until the directory has accepted the
    /// credentials, so a failed login leaves no session behind.
    pub async fn login(
        &self,
        request: &RequestClaims,
        credentials: &Credentials,
    ) -> Result<LoginOutcome> {
        let claimed = match request.session_id.as_deref() {
            Some(session_id) => self.sessions.load(session_id).await?,
            None => None,
        };
        if let Some(claimed) = &claimed {
            self.csrf.validate(request, Some(claimed))?;
        }

        let mut session = claimed.unwrap_or_default();

        let (identity, contributor) = self
            .authenticator
            .authenticate(&credentials.username, &credentials.password)
            .await
            .inspect_err(|err| {
                if err.is_login_rejection() {
                    warn!("Login refused for '{}': {err}", credentials.username);
                }
            })?;

        session.identity = Some(identity.clone());
        let csrf_token = self
            .csrf
            .can_issue_token()
            .then(|| self.csrf.refresh_token(&mut session));
        self.sessions.save(&session).await?;

        info!("'{}' logged in as {}", credentials.username, identity.id);
        Ok(LoginOutcome {
            session,
            identity,
            contributor,
            csrf_token,
        })
    }

    /// Binds the first of `permitted` the requestor holds.
    pub async fn select_role(
        &self,
        permitted: &[&str],
        identity: Option<&Identity>,
    ) -> Result<RoleBinding> {
        self.roles.select(permitted, identity).await
    }

    /// Ends the requestor's session.
    ///
    /// A signed-in session loses its identity and stays alive anonymously; an
    /// anonymous session is destroyed. A request without a session gets
    /// [`LogoutOutcome::SessionNotFound`], which is still a success.
    pub async fn logout(&self, request: &RequestClaims) -> Result<LogoutOutcome> {
        let Some(session_id) = request.session_id.as_deref() else {
            return Ok(LogoutOutcome::SessionNotFound);
        };
        let Some(mut session) = self.sessions.load(session_id).await? else {
            debug!("Logout for unknown session");
            return Ok(LogoutOutcome::SessionNotFound);
        };

        if let Some(identity) = session.identity.take() {
            self.sessions.save(&session).await?;
            info!("{} logged out", identity.id);
            Ok(LogoutOutcome::ResetContent {
                session_destroyed: false,
            })
        } else {
            self.sessions.destroy(&session.id).await?;
            Ok(LogoutOutcome::ResetContent {
                session_destroyed: true,
            })
        }
    }
}
