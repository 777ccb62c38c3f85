//! Inventory record repository
//!
//! Inbound and outbound movements, the stock recomputation that follows every
//! mutation, and the period sums used by reports.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use stockroom_types::RecordKind;
use tracing::{info, warn};

use crate::database::MaterialRepository;
use crate::models::{InRecordView, Material, NewInRecord, NewOutRecord, OutRecordView};

/// Optional filters applied to record listings
#[derive(Debug, Clone, Default)]
pub struct RecordFilter<'a> {
    /// Trimmed, case-insensitive category (list endpoints)
    pub category_loose: Option<&'a str>,
    /// Exact category (reports)
    pub category: Option<&'a str>,
    pub item_id: Option<&'a str>,
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub until: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct RecordRepository {
    pool: SqlitePool,
}

impl RecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ============================================
    // Writes (inside a transaction)
    // ============================================

    pub async fn insert_in(
        conn: &mut SqliteConnection,
        material: &Material,
        record: &NewInRecord,
        date: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO in_record (date, material_id, quantity, source, handler, barcode)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(date)
        .bind(material.id)
        .bind(record.quantity)
        .bind(&record.source)
        .bind(&record.handler)
        .bind(&material.barcode)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    pub async fn insert_out(
        conn: &mut SqliteConnection,
        material: &Material,
        record: &NewOutRecord,
        date: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO out_record
            (date, material_id, quantity, user, department, purpose, barcode, source, handler)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(date)
        .bind(material.id)
        .bind(record.quantity)
        .bind(&record.user)
        .bind(&record.department)
        .bind(&record.purpose)
        .bind(&material.barcode)
        .bind(&record.source)
        .bind(&record.handler)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    /// Material id owning a record, if the record exists
    pub async fn material_of(
        conn: &mut SqliteConnection,
        kind: RecordKind,
        record_id: i64,
    ) -> Result<Option<i64>, sqlx::Error> {
        let sql = format!("SELECT material_id FROM {} WHERE id = ?", table(kind));
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(record_id)
            .fetch_optional(conn)
            .await
    }

    pub async fn delete(
        conn: &mut SqliteConnection,
        kind: RecordKind,
        record_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let sql = format!("DELETE FROM {} WHERE id = ?", table(kind));
        let result = sqlx::query(&sql).bind(record_id).execute(conn).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Recompute `current_stock` from every record of the material.
    ///
    /// Negative totals are stored as zero.
    pub async fn recompute_stock(
        conn: &mut SqliteConnection,
        material: &Material,
    ) -> Result<i64, sqlx::Error> {
        let total_in: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM in_record WHERE material_id = ?",
        )
        .bind(material.id)
        .fetch_one(&mut *conn)
        .await?;
        let total_out: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM out_record WHERE material_id = ?",
        )
        .bind(material.id)
        .fetch_one(&mut *conn)
        .await?;

        let mut stock = total_in - total_out;
        if stock < 0 {
            warn!(
                "Material {} computed stock is negative ({}), clamped to 0",
                material.item_id, stock
            );
            stock = 0;
        }
        MaterialRepository::set_current_stock(conn, material.id, stock).await?;
        info!("Material {} stock updated to {}", material.item_id, stock);
        Ok(stock)
    }

    // ============================================
    // Listings
    // ============================================

    /// Inbound records joined with their material, newest first
    pub async fn list_in(&self, filter: &RecordFilter<'_>) -> Result<Vec<InRecordView>, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT r.id, r.date, m.item_id, m.category, m.name AS material_name,
                   r.quantity, r.source, r.handler, r.barcode
            FROM in_record r JOIN materials m ON r.material_id = m.id
            WHERE 1 = 1
            "#,
        );
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY r.date DESC, r.id DESC");
        qb.build_query_as::<InRecordView>().fetch_all(&self.pool).await
    }

    /// Outbound records joined with their material, newest first
    pub async fn list_out(
        &self,
        filter: &RecordFilter<'_>,
    ) -> Result<Vec<OutRecordView>, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT r.id, r.date, m.item_id, m.category, m.name AS material_name,
                   r.quantity, r.user, r.department, r.purpose, r.barcode, r.source, r.handler
            FROM out_record r JOIN materials m ON r.material_id = m.id
            WHERE 1 = 1
            "#,
        );
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY r.date DESC, r.id DESC");
        qb.build_query_as::<OutRecordView>().fetch_all(&self.pool).await
    }

    // ============================================
    // Period sums
    // ============================================

    /// Sum of quantities of `kind` for a material in `[from, until)`.
    /// `None` bounds are open.
    pub async fn sum_between(
        &self,
        kind: RecordKind,
        material_id: i64,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT COALESCE(SUM(quantity), 0) FROM {} WHERE material_id = ",
            table(kind)
        ));
        qb.push_bind(material_id);
        if let Some(from) = from {
            qb.push(" AND date >= ").push_bind(from);
        }
        if let Some(until) = until {
            qb.push(" AND date < ").push_bind(until);
        }
        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }
}

fn table(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::In => "in_record",
        RecordKind::Out => "out_record",
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RecordFilter<'_>) {
    if let Some(category) = filter.category_loose {
        qb.push(" AND lower(trim(m.category)) = ")
            .push_bind(category.trim().to_lowercase());
    }
    if let Some(category) = filter.category {
        qb.push(" AND m.category = ").push_bind(category.to_string());
    }
    if let Some(item_id) = filter.item_id {
        qb.push(" AND m.item_id = ").push_bind(item_id.to_string());
    }
    if let Some(from) = filter.from {
        qb.push(" AND r.date >= ").push_bind(from);
    }
    if let Some(until) = filter.until {
        qb.push(" AND r.date < ").push_bind(until);
    }
}
