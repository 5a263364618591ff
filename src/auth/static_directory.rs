//! A directory served from configuration.
//!
//! Stands in for a directory server on small deployments and in tests. Only
//! single-clause equality filters such as `(uid={{username}})` are supported.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::directory::{DirectoryClient, DirectoryConfig, DirectoryEntry, RoleAttr, role_name};
use super::secret_hash::verify_secret;
use crate::prelude::*;

/// One account of the static directory.
#[derive(Clone, Deserialize)]
pub struct StaticEntry {
    pub uid: String,
    pub dn: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: RoleAttr,
}

impl StaticEntry {
    fn attribute(&self, name: &str) -> Option<&str> {
        match name.to_ascii_lowercase().as_str() {
            "uid" => Some(&self.uid),
            "dn" => Some(&self.dn),
            "cn" => role_name(&self.dn),
            _ => None,
        }
    }
}

pub struct StaticDirectory {
    search_filter: String,
    entries: Vec<StaticEntry>,
}

impl StaticDirectory {
    pub fn new(config: &DirectoryConfig) -> Self {
        info!(
            "Static directory serving {} entries under {}",
            config.entries.len(),
            config.search_base
        );
        Self {
            search_filter: config.search_filter.clone(),
            entries: config.entries.clone(),
        }
    }

    fn search(&self, username: &str) -> Result<Option<&StaticEntry>> {
        let filter = self.search_filter.replace("{{username}}", username);
        let (attribute, value) = filter
            .trim()
            .strip_prefix('(')
            .and_then(|f| f.strip_suffix(')'))
            .filter(|f| !f.contains(['(', ')', '&', '|', '!']))
            .and_then(|f| f.split_once('='))
            .ok_or_else(|| {
                Error::DirectoryUnavailable(format!("unsupported search filter '{filter}'"))
            })?;

        Ok(self
            .entries
            .iter()
            .find(|entry| entry.attribute(attribute.trim()) == Some(value.trim())))
    }
}

#[async_trait]
impl DirectoryClient for StaticDirectory {
    async fn bind_search(&self, username: &str, password: &str) -> Result<DirectoryEntry> {
        let Some(entry) = self.search(username)? else {
            debug!("No directory entry for '{username}'");
            return Err(Error::BadCredentials);
        };
        if !verify_secret(String::from(password), entry.password_hash.clone()).await? {
            debug!("Wrong password for {}", entry.dn);
            return Err(Error::BadCredentials);
        }
        Ok(DirectoryEntry {
            dn: entry.dn.clone(),
            uid: entry.uid.clone(),
            role: entry.role.clone(),
        })
    }
}
