//! Gateway configuration.
//!
//! Loaded from a TOML file. Secrets that must not live in the file (the cookie
//! signing secret) come from the environment.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

use chrono::TimeDelta;
use serde::Deserialize;
use sha2::{Digest, Sha512};
use tower_cookies::Key;
use tracing::info;

use crate::auth::directory::DirectoryConfig;
use crate::db::config::DbConfig;
use crate::prelude::*;
use crate::role::registry::{DEFAULT_ROLE, RoleCredentials};

pub const CONFIG_PATH_ENV: &str = "GATEKEEPER_CONFIG";
pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";
const MIN_SECRET_LEN: usize = 32;

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_true() -> bool {
    true
}

fn default_cookie_name() -> String {
    String::from("gatekeeper-session")
}

fn default_ttl_minutes() -> u32 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsrfConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Where sessions are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SessionStoreConfig {
    #[default]
    Memory,
    /// The `session` table of `[database]`, reached with these credentials.
    Postgres(RoleCredentials),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u32,
    /// Give every request a session, not only those that ask for one.
    #[serde(default)]
    pub create_unconditionally: bool,
    #[serde(default)]
    pub store: SessionStoreConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_minutes: default_ttl_minutes(),
            create_unconditionally: false,
            store: SessionStoreConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.ttl_minutes))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub csrf: CsrfConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Backing store location. Required unless every collaborator is in memory.
    pub database: Option<DbConfig>,
    pub directory: DirectoryConfig,
    pub roles: HashMap<String, RoleCredentials>,
}

impl GatewayConfig {
    pub fn from_file(file_path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", file_path.display());
        let contents = std::fs::read_to_string(file_path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(value: &str) -> Result<Self> {
        let config: Self = toml::from_str(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by `GATEKEEPER_CONFIG`.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map_err(|_| Error::InvalidConfig(format!("{CONFIG_PATH_ENV} is not set")))?;
        Self::from_file(Path::new(&path))
    }

    fn validate(&self) -> Result<()> {
        if !self.roles.contains_key(DEFAULT_ROLE) {
            return Err(Error::InvalidConfig(format!(
                "[roles.{DEFAULT_ROLE}] is required"
            )));
        }
        if self.session.ttl_minutes == 0 {
            return Err(Error::InvalidConfig(String::from(
                "session.ttl_minutes must be positive",
            )));
        }
        if self.session.store != SessionStoreConfig::Memory && self.database.is_none() {
            return Err(Error::InvalidConfig(String::from(
                "the postgres session store needs a [database] section",
            )));
        }
        Ok(())
    }
}

/// Cookie signing key derived from `secret`.
pub fn session_key(secret: &str) -> Result<Key> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(Error::InvalidConfig(format!(
            "{SESSION_SECRET_ENV} must be at least {MIN_SECRET_LEN} bytes"
        )));
    }
    Ok(Key::from(Sha512::digest(secret.as_bytes()).as_slice()))
}

pub fn session_key_from_env() -> Result<Key> {
    let secret = std::env::var(SESSION_SECRET_ENV)
        .map_err(|_| Error::InvalidConfig(format!("{SESSION_SECRET_ENV} is not set")))?;
    session_key(&secret)
}
