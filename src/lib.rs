//! Request-time identity gateway.
//!
//! Revives server-side sessions from a signed cookie, guards state-changing
//! requests with CSRF tokens, logs users in against a directory service and
//! binds each request to the backing-store credentials of its first permitted
//! role.
//!
//! # Usage
//!
//! ```rust,no_run
//! use gatekeeper::config::GatewayConfig;
//!
//! let config = GatewayConfig::from_env().unwrap();
//! println!("Listening on {}", config.server.listen);
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod prelude;
pub mod role;
pub mod session;
pub mod web;
mod schema;
