//! Per-request role choice and store binding.

use std::sync::Arc;

use tracing::debug;

use super::registry::{DEFAULT_ROLE, RoleRegistry};
use crate::auth::identity::Identity;
use crate::db::{BackingStore, StoreHandle};
use crate::prelude::*;

/// Role chosen for a request together with a store handle scoped to that
/// role's credentials.
#[derive(Clone)]
pub struct RoleBinding {
    pub role: String,
    pub store: StoreHandle,
}

impl std::fmt::Debug for RoleBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleBinding")
            .field("role", &self.role)
            .field("db_user", &self.store.db_user())
            .finish()
    }
}

/// Picks the first role of `permitted` the requestor holds.
///
/// Route order decides ties, not the order of the identity's roles. Every
/// requestor implicitly holds [`DEFAULT_ROLE`]. Without a match the request is
/// [`Error::Forbidden`] when the requestor is known, [`Error::Unauthorized`]
/// otherwise.
pub fn choose<'a>(permitted: &[&'a str], identity: Option<&Identity>) -> Result<&'a str> {
    let holds = |role: &str| role == DEFAULT_ROLE || identity.is_some_and(|i| i.has_role(role));

    match permitted.iter().copied().find(|&role| holds(role)) {
        Some(role) => Ok(role),
        None if identity.is_some() => Err(Error::Forbidden),
        None => Err(Error::Unauthorized),
    }
}

#[derive(Clone)]
pub struct RoleSelector {
    registry: RoleRegistry,
    store: Arc<dyn BackingStore>,
}

impl RoleSelector {
    pub fn new(registry: RoleRegistry, store: Arc<dyn BackingStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Chooses a role and binds a store handle with its credentials.
    pub async fn select(
        &self,
        permitted: &[&str],
        identity: Option<&Identity>,
    ) -> Result<RoleBinding> {
        let role = choose(permitted, identity)?;
        self.bind(role).await
    }

    /// Binds a store handle for `role`, failing closed when the registry does
    /// not know it.
    pub async fn bind(&self, role: &str) -> Result<RoleBinding> {
        let credentials = self
            .registry
            .lookup(role)
            .ok_or_else(|| Error::RoleNotRegistered(String::from(role)))?;
        let store = self.store.bind(credentials).await?;
        debug!("Bound role '{role}' as {}", store.db_user());
        Ok(RoleBinding {
            role: String::from(role),
            store,
        })
    }
}
