//! Role-bound access to the backing data store.
//!
//! Every request talks to the backing store through a [`StoreHandle`] bound to
//! the credentials of the role selected for it. The Postgres implementation
//! lives in [`connection`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::prelude::*;
use crate::role::registry::RoleCredentials;

use contributor::Contributor;

pub mod config;
pub mod connection;
pub mod contributor;

/// Lookup key for a contributor profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFilter {
    pub user_name: String,
}

impl ProfileFilter {
    pub fn by_user_name(user_name: &str) -> Self {
        Self {
            user_name: String::from(user_name),
        }
    }
}

/// Backing-store operations available to a role-bound handle.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Database user this handle is scoped to.
    fn db_user(&self) -> &str;

    /// Fetches exactly one contributor profile, or [`Error::ProfileNotFound`].
    async fn get_unique_profile(&self, filter: &ProfileFilter) -> Result<Contributor>;
}

/// Request-scoped handle to the backing store. Dropped with the request.
pub type StoreHandle = Arc<dyn RoleStore>;

/// Produces role-bound store handles.
#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn bind(&self, credentials: &RoleCredentials) -> Result<StoreHandle>;
}
