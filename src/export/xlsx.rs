//! XLSX rendering (rust_xlsxwriter)

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};

use crate::services::report_service::{Cell, Report};

/// Worksheet layout: title on row 0, headers on row 2, data from row 3.
/// Stock summaries get a signature block three rows under the data.
pub fn report_xlsx(report: &Report) -> anyhow::Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(report.report_type.title())?;

    let title_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(0xD9D9D9));
    let header_format = Format::new().set_bold();
    let alert_format = Format::new().set_font_color(Color::Red);

    // Track the widest text per column for sizing
    let mut widths: Vec<usize> = vec![0; report.headers.len().max(1)];
    let mut track = |col: usize, text: &str| {
        if let Some(w) = widths.get_mut(col) {
            *w = (*w).max(text.chars().count());
        }
    };

    sheet.write_string_with_format(0, 0, &report.title, &title_format)?;
    track(0, &report.title);

    for (col, header) in report.headers.iter().enumerate() {
        sheet.write_string_with_format(2, col as u16, *header, &header_format)?;
        track(col, header);
    }

    let mut row_idx: u32 = 3;
    for row in &report.rows {
        for (col, cell) in row.cells.iter().enumerate() {
            let col16 = col as u16;
            let alert = row.alert_column == Some(col);
            match (cell, alert) {
                (Cell::Number(n), false) => {
                    sheet.write_number(row_idx, col16, *n as f64)?;
                }
                (Cell::Number(n), true) => {
                    sheet.write_number_with_format(row_idx, col16, *n as f64, &alert_format)?;
                }
                (Cell::Text(s), false) => {
                    sheet.write_string(row_idx, col16, s)?;
                }
                (Cell::Text(s), true) => {
                    sheet.write_string_with_format(row_idx, col16, s, &alert_format)?;
                }
            }
            track(col, &cell.display());
        }
        row_idx += 1;
    }

    if !report.signatures.is_empty() {
        let footer = row_idx + 2;
        for (i, label) in report.signatures.iter().enumerate() {
            sheet.write_string(footer, (i * 2) as u16, *label)?;
        }
        sheet.write_string(
            footer + 2,
            0,
            format!("製表日期: {}", report.generated_on.format("%Y-%m-%d")),
        )?;
    }

    for (col, width) in widths.iter().enumerate() {
        // Title text would otherwise blow up the first column
        let width = if col == 0 { (*width).min(16) } else { *width };
        sheet.set_column_width(col as u16, (width + 2) as f64 * 1.2)?;
    }

    Ok(workbook.save_to_buffer()?)
}
