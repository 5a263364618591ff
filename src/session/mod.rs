//! Server-side session records and the stores that keep them.
//!
//! A [`Session`] is keyed by an opaque id carried in the session cookie. It is
//! anonymous until a login attaches an [`Identity`], and carries the CSRF
//! token issued to the client.
//!
//! Stores give no transactional guarantees: two requests saving the same
//! session concurrently race and the last write wins.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::auth::identity::Identity;
use crate::auth::token::random_token;
use crate::prelude::*;

pub mod memory;
pub mod pg;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub identity: Option<Identity>,
    pub csrf_token: Option<String>,
}

impl Session {
    /// A fresh anonymous session with a random id. Not persisted until saved.
    pub fn new() -> Self {
        Self {
            id: random_token(),
            identity: None,
            csrf_token: None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Persistence for sessions, keyed by session id. Implementations must be safe
/// for concurrent use; expired records are reported as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Allocates and persists a new anonymous session.
    async fn create(&self) -> Result<Session> {
        let session = Session::new();
        self.save(&session).await?;
        Ok(session)
    }

    async fn load(&self, session_id: &str) -> Result<Option<Session>>;

    /// Inserts or overwrites the record and renews its expiry.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Removes the record. Destroying an unknown id is not an error.
    async fn destroy(&self, session_id: &str) -> Result<()>;

    /// Deletes every expired record, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize>;
}

/// Purges `store` every `period` until the returned task is aborted.
///
/// Sessions that are never claimed again are otherwise kept forever.
pub fn spawn_reaper(store: Arc<dyn SessionStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!("Purged {purged} expired sessions"),
                Err(err) => error!("Failed to purge expired sessions: {err}"),
            }
        }
    })
}
