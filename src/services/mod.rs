//! Domain services

pub mod inventory_service;
pub mod login_gate;
pub mod report_service;

pub use inventory_service::InventoryService;
pub use login_gate::LoginGate;
pub use report_service::{build_report, Report, ReportParams};
