//! stockroom_server - inventory REST API and static pages
//!
//! ## Usage
//!
//! ```bash
//! # Create the department and admin accounts
//! STOCKROOM_ADMIN_PASSWORD=... stockroom_server seed-users
//!
//! # Start the server
//! STOCKROOM_DATA_DIR=./data stockroom_server serve
//!
//! curl http://localhost:5000/api/health
//! ```

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use stockroom::auth::hash_password;
use stockroom::portal::Roster;
use stockroom::{build_router, AppState, DatabaseConfig, DatabaseRegistry, ServerConfig};

/// Password of every query account created by `seed-users`
const QUERY_ACCOUNT_PASSWORD: &str = "FSVS";

#[derive(Parser)]
#[command(name = "stockroom_server")]
#[command(version)]
#[command(about = "Multi-department inventory server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the API and static pages (default)
    Serve {
        /// Listen address, overrides STOCKROOM_BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },

    /// Create the department, query and admin accounts if missing
    SeedUsers {
        /// Admin password
        #[arg(long, env = "STOCKROOM_ADMIN_PASSWORD")]
        admin_password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stockroom=debug,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ServerConfig::from_env();
    let databases = DatabaseRegistry::new(DatabaseConfig::new(
        &config.data_dir,
        config.max_connections,
    ));

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(config, databases).await
        }
        Commands::SeedUsers { admin_password } => {
            let result = seed_users(&databases, &admin_password).await;
            databases.close().await;
            result
        }
    }
}

async fn serve(config: ServerConfig, databases: DatabaseRegistry) -> anyhow::Result<()> {
    // Fail early on an unusable data directory
    databases
        .main()
        .await
        .with_context(|| format!("opening main database in {}", config.data_dir.display()))?;

    let roster = Roster::load(config.roster_path.as_deref())?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, databases, roster);

    if let Some(gate) = &state.login_gate {
        gate.spawn_sweeper(Duration::from_secs(60));
        tracing::info!(
            "Exclusive login enabled (idle logout after {}s)",
            state.config.idle_logout.as_secs()
        );
    }

    let app = build_router(state.clone());
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;
    tracing::info!("stockroom_server listening on {bind_addr}");
    tracing::info!("Static pages from {}", state.config.static_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.databases.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

async fn seed_users(databases: &DatabaseRegistry, admin_password: &str) -> anyhow::Result<()> {
    let users = databases.users().await?;

    let mut accounts: Vec<(String, String, &str)> =
        vec![("admin".to_string(), admin_password.to_string(), "admin")];
    for n in 1..=9 {
        accounts.push((format!("dep{n}"), format!("pass{n}"), "user"));
        accounts.push((format!("dep{n}T"), QUERY_ACCOUNT_PASSWORD.to_string(), "user"));
    }

    let mut created = 0;
    for (username, password, role) in &accounts {
        if users.find(username).await?.is_some() {
            tracing::debug!("User {} exists, skipped", username);
            continue;
        }
        let hash = hash_password(password)?;
        users.insert(username, &hash, role, Utc::now()).await?;
        created += 1;
    }
    tracing::info!("Seeded {} of {} accounts", created, accounts.len());
    Ok(())
}
