use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use super::{Session, SessionStore};
use crate::prelude::*;

struct Record {
    session: Session,
    expires_at: DateTime<Utc>,
}

/// In-process session store. Records vanish on restart.
pub struct MemorySessionStore {
    ttl: TimeDelta,
    records: RwLock<HashMap<String, Record>>,
}

impl MemorySessionStore {
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            ttl,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.expires_at > now)
            .count()
    }

    /// Number of records held, expired or not.
    pub async fn stored(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<Session>> {
        let records = self.records.read().await;
        Ok(records
            .get(session_id)
            .filter(|r| r.expires_at > Utc::now())
            .map(|r| r.session.clone()))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::Generic(String::from("Session expiry out of range")))?;
        self.records.write().await.insert(
            session.id.clone(),
            Record {
                session: session.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<()> {
        self.records.write().await.remove(session_id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| r.expires_at > now);
        Ok(before - records.len())
    }
}
