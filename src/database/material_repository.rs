//! Material repository
//!
//! Catalog lookups and mutations. Category and barcode comparisons used by
//! the scanning pages are trimmed and case-insensitive.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::models::Material;

const MATERIAL_COLUMNS: &str =
    "id, item_id, name, unit, category, safety_stock, current_stock, notes, barcode";

/// Fields of a material about to be inserted
#[derive(Debug, Clone)]
pub struct MaterialInsert {
    pub item_id: String,
    pub name: String,
    pub unit: String,
    pub category: String,
    pub safety_stock: i64,
    pub notes: Option<String>,
    pub barcode: String,
}

#[derive(Clone)]
pub struct MaterialRepository {
    pool: SqlitePool,
}

impl MaterialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ============================================
    // Lookups
    // ============================================

    /// All materials ordered by item id, optionally narrowed to one category
    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Material>, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM materials", MATERIAL_COLUMNS));
        if let Some(category) = category {
            qb.push(" WHERE lower(trim(category)) = ")
                .push_bind(category.trim().to_lowercase());
        }
        qb.push(" ORDER BY item_id");
        qb.build_query_as::<Material>().fetch_all(&self.pool).await
    }

    /// Report listing: exact category and item id filters
    pub async fn list_for_report(
        &self,
        category: Option<&str>,
        item_id: Option<&str>,
        low_stock_only: bool,
    ) -> Result<Vec<Material>, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM materials WHERE 1 = 1",
            MATERIAL_COLUMNS
        ));
        if low_stock_only {
            qb.push(" AND safety_stock > 0 AND current_stock <= safety_stock");
        }
        if let Some(category) = category {
            qb.push(" AND category = ").push_bind(category.to_string());
        }
        if let Some(item_id) = item_id {
            qb.push(" AND item_id = ").push_bind(item_id.to_string());
        }
        qb.push(" ORDER BY item_id");
        qb.build_query_as::<Material>().fetch_all(&self.pool).await
    }

    pub async fn find_by_item_id(&self, item_id: &str) -> Result<Option<Material>, sqlx::Error> {
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE item_id = ?",
            MATERIAL_COLUMNS
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Re-read a material inside a transaction
    pub async fn find_by_id_in(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<Material>, sqlx::Error> {
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE id = ?",
            MATERIAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn find_by_barcode(&self, barcode: &str) -> Result<Option<Material>, sqlx::Error> {
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE lower(trim(barcode)) = ? LIMIT 1",
            MATERIAL_COLUMNS
        ))
        .bind(barcode.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
    }

    /// Whether another material already carries `barcode`
    pub async fn barcode_taken(
        &self,
        barcode: &str,
        except_item_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM materials WHERE lower(trim(barcode)) = ");
        qb.push_bind(barcode.trim().to_lowercase());
        if let Some(item_id) = except_item_id {
            qb.push(" AND item_id != ").push_bind(item_id.to_string());
        }
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count > 0)
    }

    /// Highest generated item id: `M` followed by four or more digits
    pub async fn last_generated_item_id(&self) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT item_id FROM materials \
             WHERE item_id GLOB 'M[0-9][0-9][0-9][0-9]*' AND substr(item_id, 2) NOT GLOB '*[^0-9]*' \
             ORDER BY CAST(substr(item_id, 2) AS INTEGER) DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
    }

    /// Whether any material sits in `category` (trimmed, case-insensitive)
    pub async fn category_in_use(&self, category: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM materials WHERE lower(trim(category)) = ?",
        )
        .bind(category.trim().to_lowercase())
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// (total materials, materials strictly below their safety stock)
    pub async fn summary(&self) -> Result<(i64, i64), sqlx::Error> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(item_id) FROM materials")
            .fetch_one(&self.pool)
            .await?;
        let low: i64 = sqlx::query_scalar(
            "SELECT COUNT(item_id) FROM materials WHERE current_stock < safety_stock AND safety_stock > 0",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok((total, low))
    }

    // ============================================
    // Mutations
    // ============================================

    pub async fn insert(&self, new: &MaterialInsert) -> Result<Material, sqlx::Error> {
        sqlx::query_as::<_, Material>(&format!(
            r#"
            INSERT INTO materials
            (item_id, name, unit, category, safety_stock, current_stock, notes, barcode)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING {}
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(&new.item_id)
        .bind(&new.name)
        .bind(&new.unit)
        .bind(&new.category)
        .bind(new.safety_stock)
        .bind(&new.notes)
        .bind(&new.barcode)
        .fetch_one(&self.pool)
        .await
    }

    /// Persist the editable fields of `material`
    pub async fn update(&self, material: &Material) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE materials
            SET name = ?, unit = ?, category = ?, safety_stock = ?, notes = ?, barcode = ?
            WHERE id = ?
            "#,
        )
        .bind(&material.name)
        .bind(&material.unit)
        .bind(&material.category)
        .bind(material.safety_stock)
        .bind(&material.notes)
        .bind(&material.barcode)
        .bind(material.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a material; its records go with it
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM materials WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_current_stock(
        conn: &mut SqliteConnection,
        id: i64,
        stock: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE materials SET current_stock = ? WHERE id = ?")
            .bind(stock)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
