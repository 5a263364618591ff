//! Backing-store connection configuration.

use std::fmt::Display;

use serde::Deserialize;

use crate::role::registry::RoleCredentials;

fn default_port() -> u16 {
    5432
}

/// Where the backing store lives. Credentials are never part of this
/// configuration; they come from the role a connection is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DbConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub name: String,
}

impl DbConfig {
    /// Connection URL authenticated as `credentials`.
    pub fn url_for(&self, credentials: &RoleCredentials) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(&credentials.db_user),
            urlencoding::encode(&credentials.db_password),
            self.host,
            self.port,
            self.name
        )
    }
}

impl Display for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "postgres://{}:{}/{}", self.host, self.port, self.name)
    }
}
