//! Shared API Types for stockroom
//!
//! Every type that crosses the HTTP boundary between the inventory server,
//! the static pages and the scan CLI lives here.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────────┐         ┌──────────────────┐
//! │  Rust Server     │  JSON   │  Scan CLI /      │
//! │  (Axum)          │ ◄─────► │  static pages    │
//! └──────────────────┘         └──────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. Request bodies are lenient: required fields are `Option` so the server
//!    can name what is missing instead of failing deserialization.
//! 2. Field names follow the wire format the pages already use
//!    (`lowStock`, `fontBase64`, `type`).

pub mod portal;
pub mod report;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub use portal::*;
pub use report::*;

// ============================================================================
// COMMON
// ============================================================================

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Integer that may arrive as a JSON number or a numeric string.
///
/// `null` and a missing key both read as `None`.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected an integer, got {}", n))),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got {:?}", s))),
        Some(other) => Err(D::Error::custom(format!("expected an integer, got {}", other))),
    }
}

/// Distinguishes an absent key from an explicit `null`.
///
/// `{"barcode": null}` becomes `Some(None)`, a missing key stays `None`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// AUTH API
// ============================================================================

/// Login / register body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub old_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbUriResponse {
    pub db_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontResponse {
    #[serde(rename = "fontBase64")]
    pub font_base64: String,
}

// ============================================================================
// MATERIALS API
// ============================================================================

/// A catalog item as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDto {
    pub item_id: String,
    pub barcode: Option<String>,
    pub name: String,
    pub unit: String,
    pub category: String,
    pub safety_stock: i64,
    pub current_stock: i64,
    pub notes: Option<String>,
}

impl MaterialDto {
    pub fn is_low_stock(&self) -> bool {
        is_low_stock(self.safety_stock, self.current_stock)
    }
}

/// A material is low on stock once it has a safety level and sits at or below it
pub fn is_low_stock(safety_stock: i64, current_stock: i64) -> bool {
    safety_stock > 0 && current_stock <= safety_stock
}

/// Material fields echoed back after a stock movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialBrief {
    pub item_id: String,
    pub name: String,
    pub category: String,
    pub current_stock: i64,
    pub unit: String,
    pub barcode: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMaterialRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub safety_stock: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialCreated {
    pub message: String,
    pub item_id: String,
    pub barcode: String,
}

/// Partial update. `barcode: null` or `""` clears the barcode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub safety_stock: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub barcode: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialSummary {
    pub total: i64,
    #[serde(rename = "lowStock")]
    pub low_stock: i64,
}

// ============================================================================
// CATEGORIES API
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDto {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCreated {
    pub message: String,
    pub id: i64,
}

// ============================================================================
// INVENTORY RECORDS API
// ============================================================================

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    In,
    Out,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::In => "in",
            RecordKind::Out => "out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(RecordKind::In),
            "out" => Some(RecordKind::Out),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scan-driven movement, keyed by item id.
///
/// `kind` and `quantity` stay loosely typed so the server can answer with a
/// precise 400 (`quantity` may arrive as a number or a numeric string).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordRequest {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub quantity: Option<serde_json::Value>,
    #[serde(default)]
    pub scan_mode: bool,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEcho {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResponse {
    pub success: bool,
    pub record: RecordEcho,
    pub material: MaterialBrief,
}

/// Manual in/out entry from the management pages, keyed by item id in
/// `material_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualRecordRequest {
    #[serde(default)]
    pub material_id: Option<String>,
    /// Number or numeric string, validated like a scan quantity
    #[serde(default)]
    pub quantity: Option<serde_json::Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityEcho {
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualRecordResponse {
    pub message: String,
    pub stock: i64,
    pub material: MaterialBrief,
    pub record: QuantityEcho,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InRecordRow {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub material_id: String,
    pub category: String,
    pub material_name: String,
    pub quantity: i64,
    pub source: Option<String>,
    pub handler: Option<String>,
    pub barcode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutRecordRow {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub material_id: String,
    pub material_name: String,
    pub category: String,
    pub quantity: i64,
    pub user: Option<String>,
    pub department: Option<String>,
    pub purpose: Option<String>,
    pub barcode: Option<String>,
    pub source: Option<String>,
    pub handler: Option<String>,
}

/// `?category=` filter shared by list endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryFilter {
    #[serde(default)]
    pub category: Option<String>,
}
