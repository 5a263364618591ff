//! Normalized authenticated-user record.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is making a request, as established by a successful login.
///
/// `id` and `display_name` come from the contributor profile held in the
/// backing store; `roles` come from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub roles: HashSet<String>,
    pub display_name: String,
}

impl Identity {
    pub fn new(id: Uuid, roles: HashSet<String>, display_name: String) -> Self {
        Self {
            id,
            roles,
            display_name,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
