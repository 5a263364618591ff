pub mod csrf;
pub mod directory;
pub mod identity;
pub mod secret_hash;
pub mod static_directory;
pub mod token;
