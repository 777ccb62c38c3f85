//! Database connection and management module
//!
//! Each department works against its own SQLite file. The registry opens a
//! pool per file on first use, creates the schema once per file and process,
//! and hands out cheap clones afterwards. Login and user management always go
//! to the main file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

pub mod category_repository;
pub mod material_repository;
pub mod record_repository;
pub mod schema;
pub mod user_repository;

pub use category_repository::CategoryRepository;
pub use material_repository::MaterialRepository;
pub use record_repository::RecordRepository;
pub use user_repository::UserRepository;

const MAIN_DB_FILE: &str = "materials.db";

/// Which database file a user works against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseKey {
    Main,
    /// Department number 1..=9
    Department(u8),
}

impl DatabaseKey {
    /// Map a username to its database.
    ///
    /// `dep<n>` and the query account `dep<n>t` (case-insensitive) with
    /// n in 1..=9 map to department n; everyone else uses the main file.
    pub fn for_username(username: &str) -> Self {
        let lower = username.to_lowercase();
        let Some(suffix) = lower.strip_prefix("dep") else {
            return DatabaseKey::Main;
        };
        let suffix = suffix.strip_suffix('t').unwrap_or(suffix);
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return DatabaseKey::Main;
        }
        match suffix.parse::<u8>() {
            Ok(n @ 1..=9) => DatabaseKey::Department(n),
            _ => DatabaseKey::Main,
        }
    }

    pub fn file_name(&self) -> String {
        match self {
            DatabaseKey::Main => MAIN_DB_FILE.to_string(),
            DatabaseKey::Department(n) => format!("materials_{}.db", n),
        }
    }

    /// Short token stored in JWT claims
    pub fn as_claim(&self) -> String {
        match self {
            DatabaseKey::Main => "main".to_string(),
            DatabaseKey::Department(n) => format!("dep{}", n),
        }
    }

    pub fn from_claim(claim: &str) -> Option<Self> {
        if claim == "main" {
            return Some(DatabaseKey::Main);
        }
        match claim.strip_prefix("dep")?.parse::<u8>() {
            Ok(n @ 1..=9) => Some(DatabaseKey::Department(n)),
            _ => None,
        }
    }

    pub fn path_in(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.file_name())
    }

    /// `sqlite:///<absolute path>` form reported by `/api/get-db-uri`
    pub fn uri_in(&self, data_dir: &Path) -> String {
        let path = self.path_in(data_dir);
        let absolute = std::path::absolute(&path).unwrap_or(path);
        format!("sqlite:///{}", absolute.display())
    }
}

/// Pool configuration shared by every department file
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub data_dir: PathBuf,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl DatabaseConfig {
    pub fn new(data_dir: impl Into<PathBuf>, max_connections: u32) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_connections,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// An open department database
#[derive(Clone)]
pub struct DepartmentDb {
    pub key: DatabaseKey,
    pub pool: SqlitePool,
    /// Serializes check-then-write sequences (stock checks, id generation)
    pub write_lock: Arc<Mutex<()>>,
}

impl DepartmentDb {
    pub fn materials(&self) -> MaterialRepository {
        MaterialRepository::new(self.pool.clone())
    }

    pub fn records(&self) -> RecordRepository {
        RecordRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    /// Only meaningful on the main database
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }
}

/// Lazily opened pools, one per database file
pub struct DatabaseRegistry {
    config: DatabaseConfig,
    pools: RwLock<HashMap<DatabaseKey, DepartmentDb>>,
}

impl DatabaseRegistry {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pools: RwLock::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Open (or reuse) the database for `key`, creating the schema on first use
    pub async fn get(&self, key: DatabaseKey) -> Result<DepartmentDb, sqlx::Error> {
        // Fast path: already open
        if let Some(db) = self.pools.read().await.get(&key) {
            return Ok(db.clone());
        }

        let mut pools = self.pools.write().await;
        if let Some(db) = pools.get(&key) {
            return Ok(db.clone());
        }

        let path = key.path_in(&self.config.data_dir);
        info!("Opening database {}", path.display());
        let pool = self.connect(&path).await?;
        schema::ensure_schema(&pool).await?;
        debug!("Schema checked for {}", path.display());

        let db = DepartmentDb {
            key,
            pool,
            write_lock: Arc::new(Mutex::new(())),
        };
        pools.insert(key, db.clone());
        Ok(db)
    }

    /// The main database, home of the user table
    pub async fn main(&self) -> Result<DepartmentDb, sqlx::Error> {
        self.get(DatabaseKey::Main).await
    }

    pub async fn users(&self) -> Result<UserRepository, sqlx::Error> {
        Ok(self.main().await?.users())
    }

    async fn connect(&self, path: &Path) -> Result<SqlitePool, sqlx::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(self.config.connection_timeout);
        if let Some(idle_timeout) = self.config.idle_timeout {
            pool_options = pool_options.idle_timeout(idle_timeout);
        }

        pool_options.connect_with(options).await
    }

    /// Close every open pool
    pub async fn close(&self) {
        let pools = self.pools.read().await;
        for db in pools.values() {
            db.pool.close().await;
        }
    }
}
