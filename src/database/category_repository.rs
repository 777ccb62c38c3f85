//! Category repository

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::Category;

#[derive(Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name FROM category ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name FROM category WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Whether a category other than `except_id` already uses `name`
    /// (trimmed, case-insensitive)
    pub async fn name_taken(&self, name: &str, except_id: Option<i64>) -> Result<bool, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM category WHERE lower(trim(name)) = ");
        qb.push_bind(name.trim().to_lowercase());
        if let Some(id) = except_id {
            qb.push(" AND id != ").push_bind(id);
        }
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count > 0)
    }

    pub async fn insert(&self, name: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("INSERT INTO category (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn rename(&self, id: i64, name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE category SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM category WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
