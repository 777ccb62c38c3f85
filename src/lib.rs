//! stockroom - multi-department inventory scanning
//!
//! An axum server over one SQLite file per department, a scan client that
//! talks to it, and the account portal that routes people to their pages.
//!
//! ## Layout
//!
//! ```text
//! api (axum)  ->  services  ->  database (sqlx / SQLite)
//!                     |
//!                   export (Code128, PDF, XLSX)
//! client (reqwest) --HTTP--> api
//! ```

// Core error handling
pub mod error;

pub mod config;

// Persistence
pub mod database;
pub mod models;

// Tokens, passwords and the request guard
pub mod auth;

// Inventory rules, reports, exclusive login
pub mod services;

// Barcode sheets and report files
pub mod export;

// Account roster and login routing
pub mod portal;

// Scan client and local history
pub mod client;

// REST API (when server feature is enabled)
#[cfg(feature = "server")]
pub mod api;

pub use config::{ClientConfig, ServerConfig};
pub use database::{DatabaseConfig, DatabaseKey, DatabaseRegistry};
pub use error::{AppError, AppResult};

#[cfg(feature = "server")]
pub use api::{build_router, AppState};
