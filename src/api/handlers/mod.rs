//! Route handlers, one module per API area

pub mod auth;
pub mod backup;
pub mod categories;
pub mod font;
pub mod health;
pub mod materials;
pub mod portal;
pub mod records;
pub mod reports;

/// `?category=` value, with blanks and `all` meaning no filter
pub(crate) fn category_filter(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
}

/// Timestamp used in download file names
pub(crate) fn file_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
