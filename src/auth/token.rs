//! Unguessable opaque tokens.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of generated tokens. 43 alphanumeric characters carry a little over
/// 256 bits of entropy.
pub const TOKEN_LENGTH: usize = 43;

/// Generates a random alphanumeric token from the thread-local CSPRNG.
pub fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
