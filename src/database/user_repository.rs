//! User repository (main database only)

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::User;

const USER_COLUMNS: &str = "id, username, password_hash, password_last_changed, role";

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM user WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list(&self) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM user ORDER BY id", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO user (username, password_hash, password_last_changed, role)
            VALUES (?, ?, ?, ?)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(password_hash)
        .bind(changed_at)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn set_password(
        &self,
        id: i64,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE user SET password_hash = ?, password_last_changed = ? WHERE id = ?")
            .bind(password_hash)
            .bind(changed_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
