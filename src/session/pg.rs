//! Postgres-backed session store.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;

use super::{Session, SessionStore};
use crate::db::connection::PgPool;
use crate::prelude::*;
use crate::schema::session;

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::session)]
struct SessionRow {
    id: String,
    data: serde_json::Value,
    expires_at: DateTime<Utc>,
}

/// Keeps sessions in the `session` table as JSONB. Expired rows read as
/// absent; they are removed when encountered or by [`purge_expired`](SessionStore::purge_expired).
pub struct PgSessionStore {
    pool: PgPool,
    ttl: TimeDelta,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, ttl: TimeDelta) -> Self {
        Self { pool, ttl }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<Session>> {
        let pool = self.pool.clone();
        let session_id = String::from(session_id);
        tokio::task::spawn_blocking(move || -> Result<Option<Session>> {
            let conn = &mut pool.get()?;
            let row: Option<(serde_json::Value, DateTime<Utc>)> = session::table
                .find(&session_id)
                .select((session::data, session::expires_at))
                .first(conn)
                .optional()?;

            match row {
                Some((data, expires_at)) if expires_at > Utc::now() => {
                    Ok(Some(serde_json::from_value(data)?))
                }
                Some(_) => {
                    diesel::delete(session::table.find(&session_id)).execute(conn)?;
                    Ok(None)
                }
                None => Ok(None),
            }
        })
        .await?
    }

    async fn save(&self, record: &Session) -> Result<()> {
        let row = SessionRow {
            id: record.id.clone(),
            data: serde_json::to_value(record)?,
            expires_at: Utc::now()
                .checked_add_signed(self.ttl)
                .ok_or_else(|| Error::Generic(String::from("Session expiry out of range")))?,
        };
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = &mut pool.get()?;
            diesel::insert_into(session::table)
                .values(&row)
                .on_conflict(session::id)
                .do_update()
                .set((
                    session::data.eq(excluded(session::data)),
                    session::expires_at.eq(excluded(session::expires_at)),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await?
    }

    async fn destroy(&self, session_id: &str) -> Result<()> {
        let pool = self.pool.clone();
        let session_id = String::from(session_id);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = &mut pool.get()?;
            diesel::delete(session::table.find(&session_id)).execute(conn)?;
            Ok(())
        })
        .await?
    }

    async fn purge_expired(&self) -> Result<usize> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<usize> {
            let conn = &mut pool.get()?;
            Ok(
                diesel::delete(session::table.filter(session::expires_at.le(Utc::now())))
                    .execute(conn)?,
            )
        })
        .await?
    }
}
