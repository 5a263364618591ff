//! Argon2 password hashes for statically configured directory accounts.
//!
//! Verification costs tens of milliseconds of CPU. Async code calls
//! [`verify_secret`], which moves the work onto the blocking thread pool.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use rand::rngs::OsRng;

use crate::prelude::*;

fn hash_error(err: password_hash::Error) -> Error {
    Error::PasswordHash(err.to_string())
}

/// Hashes `secret` with a fresh salt into the PHC string a
/// `[[directory.entries]]` `password_hash` holds.
///
/// ```rust
/// use gatekeeper::auth::secret_hash::{hash_secret, secret_matches};
///
/// let phc = hash_secret("joesPassword").unwrap();
/// assert!(phc.starts_with("$argon2id$"));
/// assert!(secret_matches("joesPassword", &phc).unwrap());
/// assert!(!secret_matches("maryPassword", &phc).unwrap());
/// ```
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(hash_error)
}

/// Blocking check of `secret` against a PHC string.
///
/// A wrong secret is `Ok(false)`. A hash that does not parse, or names an
/// algorithm or parameters argon2 cannot use, is an error.
pub fn secret_matches(secret: &str, phc: &str) -> Result<bool> {
    let parsed = PasswordHash::new(phc).map_err(hash_error)?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(hash_error(err)),
    }
}

/// [`secret_matches`] on the blocking thread pool.
pub async fn verify_secret(secret: String, phc: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || secret_matches(&secret, &phc)).await?
}
