//! Request context left by the session reviver.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::identity::Identity;
use crate::gateway::{RequestClaims, Revival};
use crate::prelude::*;
use crate::role::selector::RoleBinding;
use crate::session::Session;

#[derive(Clone, Debug)]
pub struct Ctx {
    claims: RequestClaims,
    revival: Revival,
}

impl Ctx {
    pub fn new(claims: RequestClaims, revival: Revival) -> Self {
        Self { claims, revival }
    }

    /// What the request itself carried.
    pub fn claims(&self) -> &RequestClaims {
        &self.claims
    }

    pub fn revival(&self) -> &Revival {
        &self.revival
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.revival {
            Revival::Revived(session) => Some(session),
            Revival::NoSession | Revival::Stale => None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session().and_then(|s| s.identity.as_ref())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Ctx {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Ctx>()
            .cloned()
            .ok_or(Error::CtxMissing)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RoleBinding {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<RoleBinding>()
            .cloned()
            .ok_or(Error::RoleBindingMissing)
    }
}
