//! Directory-backed login.
//!
//! The directory decides whether the credentials are good and which roles the
//! account holds. The account's durable profile (id, display name) lives in
//! the backing store as a contributor keyed by the directory user id.

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::identity::Identity;
use super::static_directory::StaticEntry;
use crate::db::ProfileFilter;
use crate::db::contributor::Contributor;
use crate::prelude::*;
use crate::role::registry::DEFAULT_ROLE;
use crate::role::selector::RoleSelector;

fn default_protocol() -> String {
    String::from("ldap")
}

fn default_port() -> u16 {
    389
}

fn default_search_filter() -> String {
    String::from("(uid={{username}})")
}

/// Connection parameters for the directory service.
///
/// `hostname`, `port` and the admin bind are only read by a networked
/// [`DirectoryClient`]; the static directory needs none of them.
#[derive(Clone, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub admin_dn: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
    pub search_base: String,
    #[serde(default = "default_search_filter")]
    pub search_filter: String,
    /// Accounts served by the built-in static directory.
    #[serde(default)]
    pub entries: Vec<StaticEntry>,
}

impl DirectoryConfig {
    /// Server URL, when a directory server is configured.
    pub fn url(&self) -> Option<String> {
        self.hostname
            .as_deref()
            .map(|host| format!("{}://{}:{}", self.protocol, host, self.port))
    }

    /// The search filter with `{{username}}` substituted.
    pub fn filter_for(&self, username: &str) -> String {
        self.search_filter.replace("{{username}}", username)
    }
}

impl Display for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.url(), &self.admin_dn) {
            (Some(url), Some(admin_dn)) => write!(f, "{url} as {admin_dn} (REDACTED)"),
            (Some(url), None) => write!(f, "{url} (anonymous bind)"),
            (None, _) => write!(f, "static directory under {}", self.search_base),
        }
    }
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("url", &self.url())
            .field("admin_dn", &self.admin_dn)
            .field("search_base", &self.search_base)
            .field("search_filter", &self.search_filter)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// The role attribute of a directory record, which may be single or
/// multi-valued.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RoleAttr {
    One(String),
    Many(Vec<String>),
}

impl Default for RoleAttr {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl RoleAttr {
    pub fn values(&self) -> &[String] {
        match self {
            RoleAttr::One(value) => std::slice::from_ref(value),
            RoleAttr::Many(values) => values,
        }
    }
}

/// What a successful bind/search returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub uid: String,
    pub role: RoleAttr,
}

/// A directory service able to verify a user's password and return the
/// matching record.
///
/// Implementations return [`Error::BadCredentials`] for unknown users and
/// wrong passwords alike, and [`Error::DirectoryUnavailable`] when the service
/// cannot be reached.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn bind_search(&self, username: &str, password: &str) -> Result<DirectoryEntry>;
}

/// Leading RDN value of a group DN: `cn=editor,ou=groups,dc=x` gives `editor`.
pub fn role_name(group_dn: &str) -> Option<&str> {
    let (_, value) = group_dn.split(',').next()?.split_once('=')?;
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Role names of every group in `attr`. Malformed values are skipped.
pub fn normalize_roles(attr: &RoleAttr) -> HashSet<String> {
    attr.values()
        .iter()
        .filter_map(|dn| {
            let role = role_name(dn);
            if role.is_none() {
                warn!("Ignoring malformed role attribute '{dn}'");
            }
            role.map(String::from)
        })
        .collect()
}

#[derive(Clone)]
pub struct DirectoryAuthenticator {
    directory: Arc<dyn DirectoryClient>,
    roles: RoleSelector,
}

impl DirectoryAuthenticator {
    pub fn new(directory: Arc<dyn DirectoryClient>, roles: RoleSelector) -> Self {
        Self { directory, roles }
    }

    /// Verifies the credentials with the directory, then resolves the
    /// contributor profile through the default role's store.
    ///
    /// A directory account without a contributor profile is refused with
    /// [`Error::BadCredentials`]. No partial identity is ever returned.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Identity, Contributor)> {
        let entry = self.directory.bind_search(username, password).await?;
        let roles = normalize_roles(&entry.role);
        debug!("Directory accepted {} with roles {:?}", entry.dn, roles);

        let binding = self.roles.bind(DEFAULT_ROLE).await?;
        let contributor = binding
            .store
            .get_unique_profile(&ProfileFilter::by_user_name(&entry.uid))
            .await
            .map_err(|err| match err {
                Error::ProfileNotFound => {
                    warn!("Directory account {} has no contributor profile", entry.uid);
                    Error::BadCredentials
                }
                err => err,
            })?;

        let identity = Identity::new(contributor.id, roles, contributor.display_name.clone());
        Ok((identity, contributor))
    }
}
