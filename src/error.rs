//! Main Crate Error

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Generic {0}")]
    Generic(String),

    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Password hash: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    R2D2(#[from] diesel::r2d2::PoolError),

    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    /* Csrf Errors */
    #[error("Invalid CSRF token")]
    InvalidCsrfToken,

    /* Login Errors */
    #[error("Bad Credentials")]
    BadCredentials,
    #[error("Directory Unavailable: {0}")]
    DirectoryUnavailable(String),
    #[error("Profile Not Found")]
    ProfileNotFound,

    /* Role Errors */
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Role '{0}' has no registered credentials")]
    RoleNotRegistered(String),
    #[error("No store bound for database user '{0}'")]
    StoreNotBound(String),

    #[error("Context Missing")]
    CtxMissing,
    #[error("Role Binding Missing")]
    RoleBindingMissing,
}

impl Error {
    /// Whether this error means the login attempt itself was refused, as
    /// opposed to an infrastructure failure while handling it.
    pub fn is_login_rejection(&self) -> bool {
        matches!(self, Error::BadCredentials | Error::DirectoryUnavailable(_))
    }
}
