//! Roles: which backing-store credentials a request runs under.

pub mod registry;
pub mod selector;
