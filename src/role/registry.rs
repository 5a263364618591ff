//! Role name to backing-store credential mapping.

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use serde::Deserialize;

use crate::prelude::*;

/// Fallback role every requestor implicitly holds.
pub const DEFAULT_ROLE: &str = "default";

/// Credentials a role uses against the backing store.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct RoleCredentials {
    pub db_user: String,
    pub db_password: String,
}

impl Debug for RoleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleCredentials")
            .field("db_user", &self.db_user)
            .field("db_password", &"REDACTED")
            .finish()
    }
}

impl Display for RoleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:REDACTED", self.db_user)
    }
}

/// Immutable registry of the roles the gateway may bind.
///
/// Cloning is cheap; every clone shares the same map.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: Arc<HashMap<String, RoleCredentials>>,
}

impl RoleRegistry {
    /// Builds the registry. The `"default"` role must be present since every
    /// request falls back to it.
    pub fn new(roles: HashMap<String, RoleCredentials>) -> Result<Self> {
        if !roles.contains_key(DEFAULT_ROLE) {
            return Err(Error::InvalidConfig(format!(
                "roles must define the '{DEFAULT_ROLE}' role"
            )));
        }
        Ok(Self {
            roles: Arc::new(roles),
        })
    }

    pub fn lookup(&self, role: &str) -> Option<&RoleCredentials> {
        self.roles.get(role)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Every registered role with its credentials.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RoleCredentials)> {
        self.roles.iter()
    }
}
