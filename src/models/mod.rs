//! Database row types
//!
//! Rows are read with `sqlx::FromRow` and converted into the wire types of
//! `stockroom-types` at the API edge.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use stockroom_types::{InRecordRow, MaterialBrief, MaterialDto, OutRecordRow};

/// `materials` row
#[derive(Debug, Clone, FromRow)]
pub struct Material {
    pub id: i64,
    pub item_id: String,
    pub name: String,
    pub unit: String,
    pub category: String,
    pub safety_stock: i64,
    pub current_stock: i64,
    pub notes: Option<String>,
    pub barcode: Option<String>,
}

impl Material {
    pub fn brief(&self) -> MaterialBrief {
        MaterialBrief {
            item_id: self.item_id.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            current_stock: self.current_stock,
            unit: self.unit.clone(),
            barcode: self.barcode.clone(),
        }
    }
}

impl From<Material> for MaterialDto {
    fn from(m: Material) -> Self {
        MaterialDto {
            item_id: m.item_id,
            barcode: m.barcode,
            name: m.name,
            unit: m.unit,
            category: m.category,
            safety_stock: m.safety_stock,
            current_stock: m.current_stock,
            notes: m.notes,
        }
    }
}

/// `category` row
#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// `user` row (main database only)
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub password_last_changed: Option<DateTime<Utc>>,
    pub role: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Inbound record joined with its material
#[derive(Debug, Clone, FromRow)]
pub struct InRecordView {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub item_id: String,
    pub category: String,
    pub material_name: String,
    pub quantity: i64,
    pub source: Option<String>,
    pub handler: Option<String>,
    pub barcode: Option<String>,
}

impl From<InRecordView> for InRecordRow {
    fn from(r: InRecordView) -> Self {
        InRecordRow {
            id: r.id,
            date: r.date,
            material_id: r.item_id,
            category: r.category,
            material_name: r.material_name,
            quantity: r.quantity,
            source: r.source,
            handler: r.handler,
            barcode: r.barcode,
        }
    }
}

/// Outbound record joined with its material
#[derive(Debug, Clone, FromRow)]
pub struct OutRecordView {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub item_id: String,
    pub category: String,
    pub material_name: String,
    pub quantity: i64,
    pub user: Option<String>,
    pub department: Option<String>,
    pub purpose: Option<String>,
    pub barcode: Option<String>,
    pub source: Option<String>,
    pub handler: Option<String>,
}

impl From<OutRecordView> for OutRecordRow {
    fn from(r: OutRecordView) -> Self {
        OutRecordRow {
            id: r.id,
            date: r.date,
            material_id: r.item_id,
            material_name: r.material_name,
            category: r.category,
            quantity: r.quantity,
            user: r.user,
            department: r.department,
            purpose: r.purpose,
            barcode: r.barcode,
            source: r.source,
            handler: r.handler,
        }
    }
}

/// Fields of a new inbound movement
#[derive(Debug, Clone, Default)]
pub struct NewInRecord {
    pub quantity: i64,
    pub source: Option<String>,
    pub handler: Option<String>,
}

/// Fields of a new outbound movement
#[derive(Debug, Clone, Default)]
pub struct NewOutRecord {
    pub quantity: i64,
    pub user: Option<String>,
    pub department: Option<String>,
    pub purpose: Option<String>,
    pub source: Option<String>,
    pub handler: Option<String>,
}
