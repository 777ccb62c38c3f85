//! PDF rendering (printpdf)
//!
//! Two documents are produced: the barcode label sheet and tabular reports.
//! Layout works in points measured from the top-left corner of an A4 page.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::anyhow;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Pt, Rect, Rgb,
};
use tracing::{debug, warn};

use super::barcode::{encode_code128, EncodedBarcode};
use crate::services::report_service::{Cell, Report};

const A4_WIDTH: f32 = 595.28;
const A4_HEIGHT: f32 = 841.89;

// Barcode sheet layout
const SHEET_MARGIN: f32 = 40.0;
const LINE_HEIGHT: f32 = 18.0;
const LABEL_FONT_SIZE: f32 = 12.0;
const BARCODE_BOX_WIDTH: f32 = 320.0;
const BARCODE_BOX_HEIGHT: f32 = 100.0;
const BARCODE_PADDING: f32 = 10.0;
const BLOCK_SPACING: f32 = 20.0;

// Report layout
const REPORT_MARGIN: f32 = 30.0;
const TITLE_FONT_SIZE: f32 = 14.0;
const CELL_FONT_SIZE: f32 = 9.0;
const ROW_HEIGHT: f32 = 16.0;

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn mm(pt: f32) -> Mm {
    Mm::from(Pt(pt))
}

/// Approximate rendered width of `text`; wide glyphs count as a full em
fn text_width(text: &str, size: f32) -> f32 {
    text.chars()
        .map(|c| if c.is_ascii() { 0.55 } else { 1.0 })
        .sum::<f32>()
        * size
}

/// Cut `text` so it fits `width` points
fn fit_text(text: &str, width: f32, size: f32) -> String {
    if text_width(text, size) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        out.push(c);
        if text_width(&out, size) + size > width {
            out.pop();
            out.push('…');
            break;
        }
    }
    out
}

/// A document with a current page, drawing in top-left point coordinates
struct Canvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    pages: usize,
}

impl Canvas {
    fn new(title: &str, font_path: Option<&Path>) -> anyhow::Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, mm(A4_WIDTH), mm(A4_HEIGHT), "Page 1");
        let font = load_font(&doc, font_path)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            font,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) =
            self.doc
                .add_page(mm(A4_WIDTH), mm(A4_HEIGHT), format!("Page {}", self.pages));
        self.layer = self.doc.get_page(page).get_layer(layer);
    }

    /// Text with its baseline at `top` points from the top edge
    fn text(&self, text: &str, size: f32, x: f32, top: f32, color: Color) {
        self.layer.set_fill_color(color);
        self.layer
            .use_text(text, size, mm(x), mm(A4_HEIGHT - top), &self.font);
    }

    fn fill_rect(&self, x: f32, top: f32, width: f32, height: f32, color: Color) {
        self.layer.set_fill_color(color);
        self.layer.add_rect(Rect::new(
            mm(x),
            mm(A4_HEIGHT - top - height),
            mm(x + width),
            mm(A4_HEIGHT - top),
        ));
    }

    fn line(&self, from: (f32, f32), to: (f32, f32)) {
        self.layer.set_outline_color(rgb(0.0, 0.0, 0.0));
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(mm(from.0), mm(A4_HEIGHT - from.1)), false),
                (Point::new(mm(to.0), mm(A4_HEIGHT - to.1)), false),
            ],
            is_closed: false,
        });
    }

    fn finish(self) -> anyhow::Result<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| anyhow!("PDF serialization failed: {}", e))
    }
}

fn load_font(doc: &PdfDocumentReference, font_path: Option<&Path>) -> anyhow::Result<IndirectFontRef> {
    if let Some(path) = font_path.filter(|p| p.exists()) {
        match File::open(path) {
            Ok(file) => {
                debug!("Embedding font {}", path.display());
                return doc
                    .add_external_font(BufReader::new(file))
                    .map_err(|e| anyhow!("cannot load font {}: {}", path.display(), e));
            }
            Err(e) => warn!("Cannot open font {}: {}", path.display(), e),
        }
    } else {
        warn!("CJK font not found, PDF text falls back to Helvetica");
    }
    doc.add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("cannot load builtin font: {}", e))
}

// ============================================
// Barcode sheet
// ============================================

/// One material on the label sheet
#[derive(Debug, Clone)]
pub struct BarcodeLabel {
    pub item_id: String,
    pub name: String,
    pub barcode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BarcodeSheet {
    pub pdf: Vec<u8>,
    pub generated: usize,
    /// Materials without a barcode or whose barcode cannot be encoded
    pub skipped: usize,
}

/// Lay out one label block per material, starting a new page when the next
/// block would cross the bottom margin.
pub fn barcode_sheet(labels: &[BarcodeLabel], font_path: Option<&Path>) -> anyhow::Result<BarcodeSheet> {
    if labels.is_empty() {
        anyhow::bail!("no materials to generate barcodes for");
    }

    let encoded: Vec<(&BarcodeLabel, EncodedBarcode)> = labels
        .iter()
        .filter_map(|label| {
            let barcode = label.barcode.as_deref()?;
            match encode_code128(barcode) {
                Ok(code) => Some((label, code)),
                Err(e) => {
                    warn!("Skipping barcode of {}: {:#}", label.item_id, e);
                    None
                }
            }
        })
        .collect();
    let skipped = labels.len() - encoded.len();

    let mut canvas = Canvas::new("barcodes", font_path)?;
    let text_color = || rgb(20.0 / 255.0, 20.0 / 255.0, 20.0 / 255.0);
    let block_height = LINE_HEIGHT * 3.0 + BARCODE_BOX_HEIGHT + BLOCK_SPACING;
    let mut y = SHEET_MARGIN;

    for (label, code) in &encoded {
        if y + block_height > A4_HEIGHT - SHEET_MARGIN {
            canvas.new_page();
            y = SHEET_MARGIN;
        }

        canvas.text(&format!("物料名稱: {}", label.name), LABEL_FONT_SIZE, SHEET_MARGIN, y, text_color());
        y += LINE_HEIGHT;
        canvas.text(&format!("物料編號: {}", label.item_id), LABEL_FONT_SIZE, SHEET_MARGIN, y, text_color());
        y += LINE_HEIGHT;
        canvas.text(&format!("條碼編號: {}", code.text), LABEL_FONT_SIZE, SHEET_MARGIN, y, text_color());
        y += LINE_HEIGHT + 5.0;

        draw_barcode(&canvas, code, (A4_WIDTH - BARCODE_BOX_WIDTH) / 2.0, y);
        y += BARCODE_BOX_HEIGHT + BLOCK_SPACING;
    }

    Ok(BarcodeSheet {
        pdf: canvas.finish()?,
        generated: encoded.len(),
        skipped,
    })
}

/// Bars and human-readable text inside the 320 x 100 box at (`x`, `top`)
fn draw_barcode(canvas: &Canvas, code: &EncodedBarcode, x: f32, top: f32) {
    let bar_color = || rgb(0x4a as f32 / 255.0, 0x6f as f32 / 255.0, 0xdc as f32 / 255.0);
    let text_size = 12.0;
    let bars_width = BARCODE_BOX_WIDTH - 2.0 * BARCODE_PADDING;
    let bars_height = BARCODE_BOX_HEIGHT - 2.0 * BARCODE_PADDING - text_size - 4.0;
    let module = bars_width / code.modules.max(1) as f32;

    for bar in &code.bars {
        canvas.fill_rect(
            x + BARCODE_PADDING + bar.start as f32 * module,
            top + BARCODE_PADDING,
            bar.width as f32 * module,
            bars_height,
            bar_color(),
        );
    }

    let text_x = x + (BARCODE_BOX_WIDTH - text_width(&code.text, text_size)) / 2.0;
    let baseline = top + BARCODE_PADDING + bars_height + text_size + 2.0;
    canvas.text(&code.text, text_size, text_x, baseline, bar_color());
}

// ============================================
// Reports
// ============================================

/// Relative column widths; reports without a fixed layout split evenly
fn column_weights(columns: usize) -> Vec<f32> {
    match columns {
        10 => vec![50.0, 60.0, 110.0, 30.0, 50.0, 50.0, 50.0, 50.0, 50.0, 65.0],
        7 => vec![70.0, 70.0, 150.0, 60.0, 50.0, 70.0, 70.0],
        n => vec![1.0; n],
    }
}

/// Render a report as an A4 table with the header row repeated on every page
pub fn report_pdf(report: &Report, font_path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    let mut canvas = Canvas::new(&report.title, font_path)?;
    let black = || rgb(0.0, 0.0, 0.0);

    let table_width = A4_WIDTH - 2.0 * REPORT_MARGIN;
    let weights = column_weights(report.headers.len());
    let total: f32 = weights.iter().sum();
    let widths: Vec<f32> = weights.iter().map(|w| w / total * table_width).collect();

    let title_x = ((A4_WIDTH - text_width(&report.title, TITLE_FONT_SIZE)) / 2.0).max(REPORT_MARGIN);
    canvas.text(&report.title, TITLE_FONT_SIZE, title_x, REPORT_MARGIN + TITLE_FONT_SIZE, black());
    let mut y = REPORT_MARGIN + TITLE_FONT_SIZE + 12.0;

    let header: Vec<Cell> = report.headers.iter().map(|h| Cell::text(*h)).collect();
    draw_row(&canvas, &header, &widths, y, true, None);
    y += ROW_HEIGHT;

    for row in &report.rows {
        if y + ROW_HEIGHT > A4_HEIGHT - REPORT_MARGIN {
            canvas.new_page();
            y = REPORT_MARGIN;
            draw_row(&canvas, &header, &widths, y, true, None);
            y += ROW_HEIGHT;
        }
        draw_row(&canvas, &row.cells, &widths, y, false, row.alert_column);
        y += ROW_HEIGHT;
    }

    if !report.signatures.is_empty() {
        y += 40.0;
        if y + ROW_HEIGHT > A4_HEIGHT - REPORT_MARGIN {
            canvas.new_page();
            y = REPORT_MARGIN;
        }
        let slot = table_width / (report.signatures.len() + 1) as f32;
        let mut x = REPORT_MARGIN;
        for label in &report.signatures {
            canvas.text(label, 10.0, x, y, black());
            x += slot;
        }
        canvas.text(
            &format!("製表日期: {}", report.generated_on.format("%Y-%m-%d")),
            10.0,
            x,
            y,
            black(),
        );
    }

    canvas.finish()
}

fn draw_row(
    canvas: &Canvas,
    cells: &[Cell],
    widths: &[f32],
    top: f32,
    header: bool,
    alert_column: Option<usize>,
) {
    let left = REPORT_MARGIN;
    let right = left + widths.iter().sum::<f32>();
    if header {
        canvas.fill_rect(left, top, right - left, ROW_HEIGHT, rgb(0.83, 0.83, 0.83));
    }

    let mut x = left;
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        let text = fit_text(&cell.display(), width - 4.0, CELL_FONT_SIZE);
        let color = if alert_column == Some(i) {
            rgb(1.0, 0.0, 0.0)
        } else {
            rgb(0.0, 0.0, 0.0)
        };
        let text_x = match cell {
            Cell::Number(_) if !header => x + width - 2.0 - text_width(&text, CELL_FONT_SIZE),
            _ => x + 2.0,
        };
        canvas.text(&text, CELL_FONT_SIZE, text_x, top + ROW_HEIGHT - 4.5, color);
        canvas.line((x, top), (x, top + ROW_HEIGHT));
        x += width;
    }
    canvas.line((right, top), (right, top + ROW_HEIGHT));
    canvas.line((left, top), (right, top));
    canvas.line((left, top + ROW_HEIGHT), (right, top + ROW_HEIGHT));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::report_service::ReportRow;
    use chrono::NaiveDate;
    use stockroom_types::ReportType;

    fn label(item_id: &str, barcode: Option<&str>) -> BarcodeLabel {
        BarcodeLabel {
            item_id: item_id.to_string(),
            name: format!("Item {}", item_id),
            barcode: barcode.map(str::to_string),
        }
    }

    #[test]
    fn sheet_counts_skipped_materials() {
        let labels = vec![
            label("M0001", Some("BC-00M0001")),
            label("M0002", None),
            label("M0003", Some("條碼")),
            label("M0004", Some("BC-00M0004")),
        ];
        let sheet = barcode_sheet(&labels, None).unwrap();
        assert_eq!(sheet.generated, 2);
        assert_eq!(sheet.skipped, 2);
        assert!(sheet.pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_sheet_is_an_error() {
        let err = barcode_sheet(&[], None).unwrap_err();
        assert!(err.to_string().contains("no materials"));
    }

    #[test]
    fn long_sheets_paginate() {
        let labels: Vec<BarcodeLabel> = (1..=12)
            .map(|n| label(&format!("M{:04}", n), Some(&format!("BC-00M{:04}", n))))
            .collect();
        let sheet = barcode_sheet(&labels, None).unwrap();
        assert_eq!(sheet.generated, 12);
    }

    #[test]
    fn fit_text_truncates_wide_text() {
        assert_eq!(fit_text("M0001", 100.0, 9.0), "M0001");
        let cut = fit_text("很長很長很長很長很長很長的名稱", 40.0, 9.0);
        assert!(cut.ends_with('…'));
        assert!(text_width(&cut, 9.0) <= 40.0 + 9.0);
    }

    #[test]
    fn report_renders_with_builtin_font() {
        let report = Report {
            report_type: ReportType::LowStockAlert,
            title: "Dept  低庫存警示報表".to_string(),
            headers: vec!["物料編號", "分類", "名稱", "單位", "安全庫存", "目前庫存", "庫存差距"],
            rows: vec![ReportRow {
                cells: vec![
                    Cell::text("M0001"),
                    Cell::text("Office"),
                    Cell::text("Tape"),
                    Cell::text("roll"),
                    Cell::Number(5),
                    Cell::Number(2),
                    Cell::Number(3),
                ],
                alert_column: Some(6),
            }],
            signatures: Vec::new(),
            generated_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        };
        let pdf = report_pdf(&report, None).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }
}
