//! Inventory rules
//!
//! Material creation and editing, stock movements and record deletion for
//! one department database. Every check-then-write sequence runs under the
//! department's write lock, and every record mutation recomputes the stock of
//! the material it touches inside the same transaction.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use stockroom_types::{
    MaterialBrief, MaterialPatch, NewMaterialRequest, RecordKind, RecordRequest,
};
use tracing::{info, warn};

use crate::database::material_repository::MaterialInsert;
use crate::database::{DepartmentDb, MaterialRepository, RecordRepository};
use crate::error::{AppError, AppResult};
use crate::models::{Material, NewInRecord, NewOutRecord};

/// Source recorded for scan-driven movements when the client names none
pub const SCAN_SOURCE: &str = "掃碼";

/// Barcode assigned to a newly created material
pub fn default_barcode(item_id: &str) -> String {
    format!("BC-00{}", item_id)
}

static ITEM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^M(\d{4,})$").expect("item id pattern"));

/// Item id following `last`, the highest existing generated id.
///
/// Ids that are not `M` plus digits restart the sequence at `M0001`.
pub fn next_item_id(last: Option<&str>) -> String {
    let next = last
        .and_then(|id| ITEM_ID.captures(id))
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    if next > 9999 {
        warn!("Item ids have outgrown four digits, issuing M{}", next);
    }
    format!("M{:04}", next)
}

/// Parse a quantity sent as a JSON number or a numeric string
pub fn parse_quantity(value: &Value) -> AppResult<i64> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let quantity = parsed.ok_or_else(|| AppError::bad_request("Invalid quantity"))?;
    if quantity <= 0 {
        return Err(AppError::bad_request("Quantity must be greater than 0"));
    }
    Ok(quantity)
}

/// A movement resolved from a request, ready to persist
#[derive(Debug, Clone)]
pub enum Movement {
    In(NewInRecord),
    Out(NewOutRecord),
}

impl Movement {
    pub fn kind(&self) -> RecordKind {
        match self {
            Movement::In(_) => RecordKind::In,
            Movement::Out(_) => RecordKind::Out,
        }
    }

    pub fn quantity(&self) -> i64 {
        match self {
            Movement::In(r) => r.quantity,
            Movement::Out(r) => r.quantity,
        }
    }

    /// Build the movement of a scan-page request on behalf of `caller`.
    ///
    /// In scan mode an absent source becomes [`SCAN_SOURCE`] and an absent
    /// handler (and, outbound, user) becomes the caller.
    pub fn from_request(req: &RecordRequest, kind: RecordKind, quantity: i64, caller: &str) -> Self {
        let scan = req.scan_mode;
        let or_scan = |value: &Option<String>, fallback: &str| -> Option<String> {
            value
                .clone()
                .or_else(|| scan.then(|| fallback.to_string()))
        };
        let source = or_scan(&req.source, SCAN_SOURCE);
        let handler = or_scan(&req.handler, caller);

        match kind {
            RecordKind::In => Movement::In(NewInRecord {
                quantity,
                source,
                handler,
            }),
            RecordKind::Out => Movement::Out(NewOutRecord {
                quantity,
                user: or_scan(&req.user, caller),
                department: req.department.clone(),
                purpose: req.purpose.clone(),
                source,
                handler,
            }),
        }
    }
}

/// Result of a persisted movement
#[derive(Debug, Clone)]
pub struct MovementOutcome {
    pub kind: RecordKind,
    pub quantity: i64,
    pub stock: i64,
    pub material: MaterialBrief,
}

pub struct InventoryService {
    db: DepartmentDb,
}

impl InventoryService {
    pub fn new(db: DepartmentDb) -> Self {
        Self { db }
    }

    fn materials(&self) -> MaterialRepository {
        self.db.materials()
    }

    // ============================================
    // Materials
    // ============================================

    pub async fn create_material(&self, req: &NewMaterialRequest) -> AppResult<Material> {
        let required = [
            ("name", &req.name),
            ("unit", &req.unit),
            ("category", &req.category),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.as_deref().map_or(true, |s| s.trim().is_empty()))
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::bad_request(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }
        let safety_stock = req.safety_stock.unwrap_or(0);
        if safety_stock < 0 {
            return Err(AppError::bad_request("safety_stock must not be negative"));
        }

        let repo = self.materials();
        let _guard = self.db.write_lock.lock().await;

        let last = repo.last_generated_item_id().await?;
        let item_id = next_item_id(last.as_deref());
        let barcode = default_barcode(&item_id);
        if repo.barcode_taken(&barcode, None).await? {
            return Err(AppError::conflict("Barcode already exists"));
        }

        let material = repo
            .insert(&MaterialInsert {
                item_id,
                name: req.name.clone().unwrap_or_default(),
                unit: req.unit.clone().unwrap_or_default(),
                category: req.category.clone().unwrap_or_default(),
                safety_stock,
                notes: Some(req.notes.clone().unwrap_or_default()),
                barcode,
            })
            .await?;
        info!("Material {} created in {}", material.item_id, self.db.key.as_claim());
        Ok(material)
    }

    pub async fn update_material(&self, item_id: &str, patch: &MaterialPatch) -> AppResult<Material> {
        let repo = self.materials();
        let _guard = self.db.write_lock.lock().await;

        let mut material = repo
            .find_by_item_id(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Material not found"))?;

        for (field, value) in [
            ("name", &patch.name),
            ("unit", &patch.unit),
            ("category", &patch.category),
        ] {
            if value.as_deref().is_some_and(|s| s.trim().is_empty()) {
                return Err(AppError::bad_request(format!("{} must not be empty", field)));
            }
        }
        if patch.safety_stock.is_some_and(|s| s < 0) {
            return Err(AppError::bad_request("safety_stock must not be negative"));
        }

        if let Some(barcode) = &patch.barcode {
            match barcode.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
                Some(clean) => {
                    if repo.barcode_taken(clean, Some(item_id)).await? {
                        return Err(AppError::conflict("Barcode already exists"));
                    }
                    material.barcode = Some(clean.to_string());
                }
                None => material.barcode = None,
            }
        }
        if let Some(name) = &patch.name {
            material.name = name.clone();
        }
        if let Some(unit) = &patch.unit {
            material.unit = unit.clone();
        }
        if let Some(category) = &patch.category {
            material.category = category.clone();
        }
        if let Some(safety_stock) = patch.safety_stock {
            material.safety_stock = safety_stock;
        }
        if let Some(notes) = &patch.notes {
            material.notes = Some(notes.clone());
        }

        repo.update(&material).await?;
        info!("Material {} updated", item_id);
        Ok(material)
    }

    pub async fn delete_material(&self, item_id: &str) -> AppResult<()> {
        let repo = self.materials();
        let _guard = self.db.write_lock.lock().await;

        let material = repo
            .find_by_item_id(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Material not found"))?;
        repo.delete(material.id).await?;
        info!("Material {} deleted", item_id);
        Ok(())
    }

    // ============================================
    // Movements
    // ============================================

    /// Scan-page movement: `{item_id, type, quantity, scan_mode, ...}`
    pub async fn record_scan(&self, req: &RecordRequest, caller: &str) -> AppResult<MovementOutcome> {
        let (Some(item_id), Some(kind), Some(quantity)) =
            (req.item_id.as_deref(), req.kind.as_deref(), req.quantity.as_ref())
        else {
            return Err(AppError::bad_request("item_id, type and quantity are required"));
        };

        let material = self
            .materials()
            .find_by_item_id(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Material not found"))?;
        let quantity = parse_quantity(quantity)?;
        let kind = RecordKind::parse(kind)
            .ok_or_else(|| AppError::bad_request("type must be 'in' or 'out'"))?;

        let movement = Movement::from_request(req, kind, quantity, caller);
        self.apply(material.id, movement).await
    }

    /// Management-page movement keyed by item id
    pub async fn record_manual(&self, item_id: &str, movement: Movement) -> AppResult<MovementOutcome> {
        if movement.quantity() <= 0 {
            return Err(AppError::bad_request("Quantity must be greater than 0"));
        }
        let material = self
            .materials()
            .find_by_item_id(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Material not found"))?;
        self.apply(material.id, movement).await
    }

    async fn apply(&self, material_id: i64, movement: Movement) -> AppResult<MovementOutcome> {
        let _guard = self.db.write_lock.lock().await;
        let mut tx = self.db.pool.begin().await?;

        let material = MaterialRepository::find_by_id_in(&mut tx, material_id)
            .await?
            .ok_or_else(|| AppError::not_found("Material not found"))?;

        let now = Utc::now();
        match &movement {
            Movement::In(record) => {
                RecordRepository::insert_in(&mut tx, &material, record, now).await?;
            }
            Movement::Out(record) => {
                if material.current_stock < record.quantity {
                    return Err(AppError::bad_request("Insufficient stock"));
                }
                RecordRepository::insert_out(&mut tx, &material, record, now).await?;
            }
        }
        let stock = RecordRepository::recompute_stock(&mut tx, &material).await?;
        tx.commit().await?;

        info!(
            "{} record of {} for material {}",
            movement.kind(),
            movement.quantity(),
            material.item_id
        );
        let mut brief = material.brief();
        brief.current_stock = stock;
        Ok(MovementOutcome {
            kind: movement.kind(),
            quantity: movement.quantity(),
            stock,
            material: brief,
        })
    }

    /// Delete a record and recompute its material's stock
    pub async fn delete_record(&self, kind: RecordKind, record_id: i64) -> AppResult<()> {
        let _guard = self.db.write_lock.lock().await;
        let mut tx = self.db.pool.begin().await?;

        let material_id = RecordRepository::material_of(&mut tx, kind, record_id)
            .await?
            .ok_or_else(|| AppError::not_found("Record not found"))?;
        RecordRepository::delete(&mut tx, kind, record_id).await?;
        if let Some(material) = MaterialRepository::find_by_id_in(&mut tx, material_id).await? {
            RecordRepository::recompute_stock(&mut tx, &material).await?;
        }
        tx.commit().await?;

        info!("{} record {} deleted", kind, record_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_ids_follow_the_highest_generated_id() {
        assert_eq!(next_item_id(None), "M0001");
        assert_eq!(next_item_id(Some("M0041")), "M0042");
        assert_eq!(next_item_id(Some("MABCD")), "M0001");
        assert_eq!(next_item_id(Some("M9999")), "M10000");
        assert_eq!(next_item_id(Some("M10000")), "M10001");
        assert_eq!(next_item_id(Some("M0500x")), "M0001");
    }

    #[test]
    fn barcode_prefixes_item_id() {
        assert_eq!(default_barcode("M0007"), "BC-00M0007");
    }

    #[test]
    fn quantities_accept_numbers_and_numeric_strings() {
        assert_eq!(parse_quantity(&json!(3)).unwrap(), 3);
        assert_eq!(parse_quantity(&json!(" 12 ")).unwrap(), 12);
        assert_eq!(parse_quantity(&json!(4.0)).unwrap(), 4);
        assert!(parse_quantity(&json!(0)).is_err());
        assert!(parse_quantity(&json!(-2)).is_err());
        assert!(parse_quantity(&json!("two")).is_err());
        assert!(parse_quantity(&json!(1.5)).is_err());
        assert!(parse_quantity(&json!(null)).is_err());
    }

    #[test]
    fn scan_mode_fills_source_and_people() {
        let req = RecordRequest {
            item_id: Some("M0001".into()),
            kind: Some("out".into()),
            quantity: Some(json!(1)),
            scan_mode: true,
            purpose: Some("lab".into()),
            ..Default::default()
        };
        match Movement::from_request(&req, RecordKind::Out, 1, "dep2") {
            Movement::Out(r) => {
                assert_eq!(r.source.as_deref(), Some(SCAN_SOURCE));
                assert_eq!(r.handler.as_deref(), Some("dep2"));
                assert_eq!(r.user.as_deref(), Some("dep2"));
                assert_eq!(r.purpose.as_deref(), Some("lab"));
            }
            Movement::In(_) => panic!("expected outbound movement"),
        }
    }

    #[test]
    fn without_scan_mode_nothing_is_filled() {
        let req = RecordRequest {
            handler: Some("amy".into()),
            ..Default::default()
        };
        match Movement::from_request(&req, RecordKind::In, 5, "dep2") {
            Movement::In(r) => {
                assert_eq!(r.source, None);
                assert_eq!(r.handler.as_deref(), Some("amy"));
            }
            Movement::Out(_) => panic!("expected inbound movement"),
        }
    }
}
