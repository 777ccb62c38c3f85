//! Runtime configuration
//!
//! Server and client settings come from environment variables. A `.env`
//! file in the working directory is loaded first when present.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

const DEV_JWT_SECRET: &str = "stockroom-dev-secret-change-me";
const DEFAULT_SCHOOL_DEPT: &str = "鳳山商工 ****科";

/// Inventory server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding `materials.db` and `materials_<n>.db`
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bind_addr: String,
    pub static_dir: PathBuf,
    pub font_path: PathBuf,
    /// Heading printed on reports when the request does not name one
    pub school_dept: String,
    pub max_connections: u32,
    /// Only one user may hold a session at a time
    pub exclusive_login: bool,
    pub idle_logout: Duration,
    /// JSON roster replacing the built-in portal accounts
    pub roster_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let data_dir: PathBuf = env_or("STOCKROOM_DATA_DIR", "./data").into();
        let jwt_secret = std::env::var("STOCKROOM_JWT_SECRET").unwrap_or_else(|_| {
            warn!("STOCKROOM_JWT_SECRET not set, using development secret");
            DEV_JWT_SECRET.to_string()
        });
        let font_path = std::env::var("STOCKROOM_FONT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_font_path(&data_dir));

        Self {
            jwt_secret,
            token_ttl: Duration::from_secs(env_parse("STOCKROOM_TOKEN_TTL_SECS", 8 * 3600)),
            bind_addr: env_or("STOCKROOM_BIND_ADDR", "0.0.0.0:5000"),
            static_dir: env_or("STOCKROOM_STATIC_DIR", "./static").into(),
            font_path,
            school_dept: env_or("STOCKROOM_SCHOOL_DEPT", DEFAULT_SCHOOL_DEPT),
            max_connections: env_parse("DATABASE_POOL_SIZE", 5),
            exclusive_login: env_parse("STOCKROOM_EXCLUSIVE_LOGIN", false),
            idle_logout: Duration::from_secs(env_parse("STOCKROOM_IDLE_LOGOUT_SECS", 180)),
            roster_path: std::env::var("STOCKROOM_PORTAL_ROSTER").ok().map(PathBuf::from),
            data_dir,
        }
    }

    /// Configuration rooted at `data_dir` with defaults for everything else
    pub fn for_data_dir(data_dir: impl Into<PathBuf>, jwt_secret: impl Into<String>) -> Self {
        let data_dir = data_dir.into();
        Self {
            font_path: default_font_path(&data_dir),
            static_dir: data_dir.join("static"),
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::from_secs(8 * 3600),
            bind_addr: "127.0.0.1:0".to_string(),
            school_dept: DEFAULT_SCHOOL_DEPT.to_string(),
            max_connections: 5,
            exclusive_login: false,
            idle_logout: Duration::from_secs(180),
            roster_path: None,
            data_dir,
        }
    }
}

/// Scan client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL including the `/api` prefix
    pub api_base_url: String,
    /// Where the bearer token is stored between runs
    pub token_file: PathBuf,
    /// Rolling transaction history
    pub history_file: PathBuf,
    /// Portal page-view counter
    pub state_file: PathBuf,
    pub roster_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let state_dir: PathBuf = env_or("STOCKROOM_CLIENT_DIR", ".stockroom").into();
        Self {
            api_base_url: env_or("STOCKROOM_API_URL", "http://127.0.0.1:5000/api"),
            token_file: state_dir.join("token"),
            history_file: state_dir.join("history.json"),
            state_file: state_dir.join("portal.json"),
            roster_path: std::env::var("STOCKROOM_PORTAL_ROSTER").ok().map(PathBuf::from),
        }
    }
}

fn default_font_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("fonts").join("NotoSansTC-Regular.ttf")
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
