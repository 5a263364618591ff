//! Postgres connection pools, one per registered role credential.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::sync::Arc;
use tracing::{debug, info};

use super::config::DbConfig;
use super::contributor::Contributor;
use super::{BackingStore, ProfileFilter, RoleStore, StoreHandle};
use crate::prelude::*;
use crate::role::registry::{RoleCredentials, RoleRegistry};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Opens a connection pool authenticated as `credentials`.
pub fn connect(config: &DbConfig, credentials: &RoleCredentials) -> Result<PgPool> {
    debug!("Opening pool for {credentials} on {config}");
    let manager = ConnectionManager::<PgConnection>::new(config.url_for(credentials));
    Ok(Pool::builder().build(manager)?)
}

/// Runs pending schema migrations on `pool`.
pub fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running Database Migrations");
    pool.get()?
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| Error::Migration(err.to_string()))?;
    Ok(())
}

/// Postgres backing store. Pools are opened for every registry entry up
/// front, so binding a role never opens new connections.
pub struct PgBackingStore {
    pools: HashMap<RoleCredentials, PgPool>,
}

impl PgBackingStore {
    pub fn new(config: &DbConfig, registry: &RoleRegistry) -> Result<Self> {
        let mut pools = HashMap::new();
        for (role, credentials) in registry.iter() {
            if pools.contains_key(credentials) {
                continue;
            }
            info!("Connecting role '{role}' as {credentials}");
            pools.insert(credentials.clone(), connect(config, credentials)?);
        }
        Ok(Self { pools })
    }
}

#[async_trait]
impl BackingStore for PgBackingStore {
    async fn bind(&self, credentials: &RoleCredentials) -> Result<StoreHandle> {
        let pool = self
            .pools
            .get(credentials)
            .ok_or_else(|| Error::StoreNotBound(credentials.db_user.clone()))?;
        Ok(Arc::new(PgRoleStore {
            db_user: credentials.db_user.clone(),
            pool: pool.clone(),
        }))
    }
}

/// Handle scoped to one role's pool. Connections are checked out per query
/// and go back to the pool as soon as the query finishes.
pub struct PgRoleStore {
    db_user: String,
    pool: PgPool,
}

#[async_trait]
impl RoleStore for PgRoleStore {
    fn db_user(&self) -> &str {
        &self.db_user
    }

    async fn get_unique_profile(&self, filter: &ProfileFilter) -> Result<Contributor> {
        let pool = self.pool.clone();
        let user_name = filter.user_name.clone();
        tokio::task::spawn_blocking(move || -> Result<Contributor> {
            let conn = &mut pool.get()?;
            Contributor::fetch_by_user_name(&user_name, conn)
        })
        .await?
    }
}
