//! Gatekeeper server and admin tool.
//!
//! ```bash
//! export SESSION_SECRET=a-long-random-string-of-at-least-32-bytes
//! gatekeeper serve --config gatekeeper.toml --migrate
//! gatekeeper hash-password
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gatekeeper::{
    auth::{
        csrf::CsrfGuard, directory::DirectoryAuthenticator, secret_hash::hash_secret,
        static_directory::StaticDirectory,
    },
    config::{GatewayConfig, SessionStoreConfig, session_key_from_env},
    db::connection::{PgBackingStore, connect, run_migrations},
    gateway::SessionGateway,
    prelude::*,
    role::{
        registry::{DEFAULT_ROLE, RoleRegistry},
        selector::RoleSelector,
    },
    session::{SessionStore, memory::MemorySessionStore, pg::PgSessionStore, spawn_reaper},
    web::{AppState, SessionCookie, routes::router},
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const REAPER_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(about = "Session, CSRF and role gateway in front of a role-scoped data store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Path to the configuration file, defaults to $GATEKEEPER_CONFIG
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run pending database migrations before serving
        #[arg(long)]
        migrate: bool,
    },

    /// Hash a password for a static directory entry
    HashPassword,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config, migrate } => serve(config, migrate).await,
        Commands::HashPassword => hash_password(),
    };

    if let Err(ref e) = result {
        error!("Error: {e}");
    }

    result
}

fn hash_password() -> Result<()> {
    let password = rpassword::prompt_password("Password > ")?;
    println!("{}", hash_secret(&password)?);
    Ok(())
}

async fn serve(config_path: Option<PathBuf>, migrate: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => GatewayConfig::from_file(&path)?,
        None => GatewayConfig::from_env()?,
    };
    let key = session_key_from_env()?;
    let db = config
        .database
        .as_ref()
        .ok_or_else(|| Error::InvalidConfig(String::from("[database] is required to serve")))?;

    let registry = RoleRegistry::new(config.roles.clone())?;
    if migrate {
        let default = registry
            .lookup(DEFAULT_ROLE)
            .ok_or_else(|| Error::RoleNotRegistered(String::from(DEFAULT_ROLE)))?;
        run_migrations(&connect(db, default)?)?;
    }

    let ttl = config.session.ttl();
    let sessions: Arc<dyn SessionStore> = match &config.session.store {
        SessionStoreConfig::Memory => Arc::new(MemorySessionStore::new(ttl)),
        SessionStoreConfig::Postgres(credentials) => {
            info!("Keeping sessions in {db}");
            Arc::new(PgSessionStore::new(connect(db, credentials)?, ttl))
        }
    };
    spawn_reaper(sessions.clone(), REAPER_INTERVAL);

    let backing_store = Arc::new(PgBackingStore::new(db, &registry)?);
    let roles = RoleSelector::new(registry, backing_store);
    let directory = Arc::new(StaticDirectory::new(&config.directory));
    let gateway = SessionGateway::new(
        CsrfGuard::new(config.csrf.enabled),
        sessions,
        DirectoryAuthenticator::new(directory, roles.clone()),
        roles,
    );
    let state = AppState::new(gateway, SessionCookie::new(&config.session.cookie_name, key))
        .create_unconditionally(config.session.create_unconditionally);

    let listener = tokio::net::TcpListener::bind(config.server.listen).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await?;
    Ok(())
}
