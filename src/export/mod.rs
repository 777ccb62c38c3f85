//! Document exports: Code128 barcodes, PDF label sheets and reports, XLSX
//! reports.

pub mod barcode;
pub mod pdf;
pub mod xlsx;

pub use barcode::encode_code128;
pub use pdf::{barcode_sheet, report_pdf, BarcodeLabel, BarcodeSheet};
pub use xlsx::report_xlsx;

use stockroom_types::MaterialDto;

use crate::models::Material;

impl From<&Material> for BarcodeLabel {
    fn from(m: &Material) -> Self {
        BarcodeLabel {
            item_id: m.item_id.clone(),
            name: m.name.clone(),
            barcode: m.barcode.clone(),
        }
    }
}

impl From<&MaterialDto> for BarcodeLabel {
    fn from(m: &MaterialDto) -> Self {
        BarcodeLabel {
            item_id: m.item_id.clone(),
            name: m.name.clone(),
            barcode: m.barcode.clone(),
        }
    }
}
