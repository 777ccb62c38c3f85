//! Schema creation and forward migration
//!
//! Tables are created when missing. Columns added to a table after a file
//! was first created are appended with `ALTER TABLE ... ADD COLUMN`.

use sqlx::{Row, SqlitePool};
use tracing::info;

const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS materials (
        id INTEGER PRIMARY KEY,
        item_id VARCHAR(50) NOT NULL UNIQUE,
        name VARCHAR(100) NOT NULL,
        unit VARCHAR(20) NOT NULL,
        category VARCHAR(50) NOT NULL,
        safety_stock INTEGER NOT NULL DEFAULT 0,
        current_stock INTEGER NOT NULL DEFAULT 0,
        notes TEXT,
        barcode VARCHAR(100) UNIQUE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ix_materials_category ON materials (category)",
    r#"
    CREATE TABLE IF NOT EXISTS in_record (
        id INTEGER PRIMARY KEY,
        date TEXT NOT NULL,
        material_id INTEGER NOT NULL REFERENCES materials (id) ON DELETE CASCADE,
        quantity INTEGER NOT NULL,
        source VARCHAR(100),
        handler VARCHAR(50),
        barcode VARCHAR(100)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ix_in_record_date ON in_record (date)",
    r#"
    CREATE TABLE IF NOT EXISTS out_record (
        id INTEGER PRIMARY KEY,
        date TEXT NOT NULL,
        material_id INTEGER NOT NULL REFERENCES materials (id) ON DELETE CASCADE,
        quantity INTEGER NOT NULL,
        user VARCHAR(50),
        department VARCHAR(50),
        purpose VARCHAR(100),
        barcode VARCHAR(100),
        source VARCHAR(100),
        handler VARCHAR(50)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ix_out_record_date ON out_record (date)",
    r#"
    CREATE TABLE IF NOT EXISTS category (
        id INTEGER PRIMARY KEY,
        name VARCHAR(50) NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user (
        id INTEGER PRIMARY KEY,
        username VARCHAR(50) NOT NULL UNIQUE,
        password_hash VARCHAR(256) NOT NULL,
        password_last_changed TEXT,
        role VARCHAR(20) NOT NULL DEFAULT 'user'
    )
    "#,
];

/// Columns that may be missing from files created by older versions:
/// (table, column, definition)
const LATE_COLUMNS: &[(&str, &str, &str)] = &[
    ("user", "password_last_changed", "TEXT NULL"),
    ("user", "role", "VARCHAR(20) NOT NULL DEFAULT 'user'"),
    ("out_record", "source", "VARCHAR(100) NULL"),
    ("out_record", "handler", "VARCHAR(50) NULL"),
    ("in_record", "barcode", "VARCHAR(100) NULL"),
    ("out_record", "barcode", "VARCHAR(100) NULL"),
    ("materials", "notes", "TEXT NULL"),
];

/// Create missing tables and append missing columns
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in CREATE_TABLES {
        sqlx::query(statement).execute(pool).await?;
    }

    for (table, column, definition) in LATE_COLUMNS {
        let existing = table_columns(pool, table).await?;
        if !existing.iter().any(|c| c == column) {
            let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition);
            info!("Column {}.{} missing, running: {}", table, column, sql);
            sqlx::query(&sql).execute(pool).await?;
        }
    }

    Ok(())
}

async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;
    rows.iter().map(|row| row.try_get::<String, _>("name")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let pool = memory_pool().await;
        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();

        let cols = table_columns(&pool, "materials").await.unwrap();
        assert!(cols.contains(&"barcode".to_string()));
    }

    #[tokio::test]
    async fn old_user_table_gains_password_timestamp() {
        let pool = memory_pool().await;
        sqlx::query(
            "CREATE TABLE user (id INTEGER PRIMARY KEY, username VARCHAR(50) NOT NULL UNIQUE, \
             password_hash VARCHAR(256) NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();

        ensure_schema(&pool).await.unwrap();

        let cols = table_columns(&pool, "user").await.unwrap();
        assert!(cols.contains(&"password_last_changed".to_string()));
        assert!(cols.contains(&"role".to_string()));
    }
}
