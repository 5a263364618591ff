use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::{TimeDelta, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use gatekeeper::{
    auth::{
        csrf::CsrfGuard,
        directory::{DirectoryAuthenticator, DirectoryClient, DirectoryConfig, DirectoryEntry, RoleAttr},
        secret_hash::hash_secret,
        static_directory::{StaticDirectory, StaticEntry},
    },
    config::session_key,
    db::{BackingStore, ProfileFilter, RoleStore, StoreHandle, contributor::Contributor},
    gateway::SessionGateway,
    prelude::*,
    role::{
        registry::{RoleCredentials, RoleRegistry},
        selector::RoleSelector,
    },
    session::memory::MemorySessionStore,
    web::{
        AppState, SessionCookie,
        routes::{api_routes, app},
    },
};

use super::api_client::ApiClient;

pub const COOKIE_NAME: &str = "gatekeeper-session";

/// Counts how often the directory is asked to authenticate someone.
pub struct CountingDirectory {
    inner: StaticDirectory,
    calls: AtomicUsize,
}

impl CountingDirectory {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryClient for CountingDirectory {
    async fn bind_search(&self, username: &str, password: &str) -> Result<DirectoryEntry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.bind_search(username, password).await
    }
}

/// In-memory backing store that remembers which database users were bound.
#[derive(Default)]
pub struct FakeBackingStore {
    profiles: Arc<HashMap<String, Contributor>>,
    bound: Mutex<Vec<String>>,
}

impl FakeBackingStore {
    pub fn last_bound(&self) -> Option<String> {
        self.bound.lock().expect("poisoned").last().cloned()
    }
}

struct FakeRoleStore {
    db_user: String,
    profiles: Arc<HashMap<String, Contributor>>,
}

#[async_trait]
impl RoleStore for FakeRoleStore {
    fn db_user(&self) -> &str {
        &self.db_user
    }

    async fn get_unique_profile(&self, filter: &ProfileFilter) -> Result<Contributor> {
        self.profiles
            .get(&filter.user_name)
            .cloned()
            .ok_or(Error::ProfileNotFound)
    }
}

#[async_trait]
impl BackingStore for FakeBackingStore {
    async fn bind(&self, credentials: &RoleCredentials) -> Result<StoreHandle> {
        self.bound
            .lock()
            .expect("poisoned")
            .push(credentials.db_user.clone());
        Ok(Arc::new(FakeRoleStore {
            db_user: credentials.db_user.clone(),
            profiles: self.profiles.clone(),
        }))
    }
}

pub struct TestOptions {
    pub csrf: bool,
    pub create_unconditionally: bool,
    pub ttl: TimeDelta,
    /// Extra routes served behind the gateway layers.
    pub routes: fn(&AppState) -> Router<AppState>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            csrf: true,
            create_unconditionally: false,
            ttl: TimeDelta::minutes(30),
            routes: |_| Router::new(),
        }
    }
}

fn contributor(user_name: &str, display_name: &str) -> Contributor {
    Contributor {
        id: Uuid::new_v4(),
        user_name: String::from(user_name),
        display_name: String::from(display_name),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn entry(uid: &str, password: &str, groups: &[&str]) -> StaticEntry {
    StaticEntry {
        uid: String::from(uid),
        dn: format!("uid={uid},ou=people,dc=samplestack,dc=org"),
        password_hash: hash_secret(password).expect("Failed to hash password"),
        role: RoleAttr::Many(
            groups
                .iter()
                .map(|group| format!("cn={group},ou=groups,dc=samplestack,dc=org"))
                .collect(),
        ),
    }
}

fn credentials(db_user: &str) -> RoleCredentials {
    RoleCredentials {
        db_user: String::from(db_user),
        db_password: String::from(db_user),
    }
}

/// A gateway served on an ephemeral port, backed entirely by in-memory
/// collaborators.
///
/// Accounts: `joe` (contributors, editor), `mary` (no groups), `audrey`
/// (auditors, a role without credentials) and `ghost` (no contributor
/// profile). Each password is `<uid>sPassword`.
pub struct TestContext {
    pub api: ApiClient,
    pub directory: Arc<CountingDirectory>,
    pub backing_store: Arc<FakeBackingStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub joe: Contributor,
    server: JoinHandle<()>,
}

impl TestContext {
    pub async fn start(options: TestOptions) -> Self {
        let joe = contributor("joe", "Joe User");
        let mary = contributor("mary", "Mary Admin");
        let audrey = contributor("audrey", "Audrey Auditor");
        let profiles = HashMap::from([
            (joe.user_name.clone(), joe.clone()),
            (mary.user_name.clone(), mary),
            (audrey.user_name.clone(), audrey),
        ]);

        let directory_config = DirectoryConfig {
            protocol: String::from("ldap"),
            hostname: None,
            port: 389,
            admin_dn: None,
            admin_password: None,
            search_base: String::from("ou=people,dc=samplestack,dc=org"),
            search_filter: String::from("(uid={{username}})"),
            entries: vec![
                entry("joe", "joesPassword", &["contributors", "editor"]),
                entry("mary", "marysPassword", &[]),
                entry("audrey", "audreysPassword", &["auditors"]),
                entry("ghost", "ghostsPassword", &["contributors"]),
            ],
        };
        let directory = Arc::new(CountingDirectory {
            inner: StaticDirectory::new(&directory_config),
            calls: AtomicUsize::new(0),
        });

        let registry = RoleRegistry::new(HashMap::from([
            (String::from("default"), credentials("guest")),
            (String::from("contributors"), credentials("contributor")),
            (String::from("editor"), credentials("editor")),
        ]))
        .expect("Invalid role registry");
        let backing_store = Arc::new(FakeBackingStore {
            profiles: Arc::new(profiles),
            bound: Mutex::new(Vec::new()),
        });
        let roles = RoleSelector::new(registry, backing_store.clone());
        let sessions = Arc::new(MemorySessionStore::new(options.ttl));

        let gateway = SessionGateway::new(
            CsrfGuard::new(options.csrf),
            sessions.clone(),
            DirectoryAuthenticator::new(directory.clone(), roles.clone()),
            roles,
        );
        let key = session_key("test secret that is long enough to sign").expect("Invalid key");
        let state = AppState::new(gateway, SessionCookie::new(COOKIE_NAME, key))
            .create_unconditionally(options.create_unconditionally);
        let app = app(api_routes(&state).merge((options.routes)(&state)), state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            api: ApiClient::new(format!("http://{addr}/v1")),
            directory,
            backing_store,
            sessions,
            joe,
            server,
        }
    }

    /// Another client against the same server, with its own cookie jar.
    pub fn new_client(&self) -> ApiClient {
        ApiClient::new(self.api_url())
    }

    fn api_url(&self) -> String {
        self.api.url().to_string()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}
