//! Report building
//!
//! Reports are built as plain tables ([`Report`]) and rendered to PDF or
//! XLSX by `crate::export`. Dates in query parameters are calendar days in
//! UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use stockroom_types::{is_low_stock, QueryMode, RecordKind, ReportQuery, ReportType};

use crate::database::record_repository::RecordFilter;
use crate::database::DepartmentDb;
use crate::error::{AppError, AppResult};

pub const LOW_STOCK_NOTE: &str = "低庫存";

const SUMMARY_HEADERS: &[&str] = &[
    "物料編號", "分類", "名稱", "單位", "上月庫存", "本月入庫", "本月出庫", "實際庫存", "安全庫存", "備註/存放點",
];
const RECORD_HEADERS: &[&str] = &["日期", "物料編號", "名稱", "分類", "數量", "來源/部門", "經手人/用途"];
const LOW_STOCK_HEADERS: &[&str] = &["物料編號", "分類", "名稱", "單位", "安全庫存", "目前庫存", "庫存差距"];
const SIGNATURES: &[&str] = &["製表人:", "科主任:", "實習組長:", "實習主任:"];

/// Reporting period, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub mode: QueryMode,
    /// Month the stock summary reports on
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// Inclusive date range `start_date..=end_date`
    pub fn date_range(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if end < start {
            return Err(AppError::bad_request("end_date is before start_date"));
        }
        Ok(Self {
            start: day_start(start),
            end: day_start(end) + Duration::days(1),
            mode: QueryMode::Daterange,
            year: end.year(),
            month: end.month(),
        })
    }

    pub fn month(year: i32, month: u32) -> AppResult<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::bad_request(format!("Invalid month: {}-{}", year, month)))?;
        let (start, end) = month_bounds(first)?;
        Ok(Self {
            start,
            end,
            mode: QueryMode::Month,
            year,
            month,
        })
    }

    /// Bounds of the month the stock summary reports on
    pub fn summary_month(&self) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| AppError::bad_request("Invalid reporting month"))?;
        month_bounds(first)
    }

    /// Human readable period printed in report titles
    pub fn label(&self) -> String {
        match self.mode {
            QueryMode::Month => format!("{}年{}月", self.year, self.month),
            QueryMode::Daterange => {
                let last_day = self.end - Duration::days(1);
                format!(
                    "{} - {}",
                    self.start.format("%Y/%m/%d"),
                    last_day.format("%Y/%m/%d")
                )
            }
        }
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

fn month_bounds(first: NaiveDate) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let next = first
        .checked_add_months(chrono::Months::new(1))
        .ok_or_else(|| AppError::bad_request("Month out of range"))?;
    Ok((day_start(first), day_start(next)))
}

/// Validated report parameters
#[derive(Debug, Clone)]
pub struct ReportParams {
    pub report_type: ReportType,
    pub category: Option<String>,
    pub item_id: Option<String>,
    pub heading: String,
    /// `None` only for the low stock alert
    pub period: Option<Period>,
}

impl ReportParams {
    /// Validate a raw query. `default_heading` is used when `school_dept` is
    /// absent.
    pub fn from_query(query: &ReportQuery, default_heading: &str) -> AppResult<Self> {
        let period = match query.report_type {
            ReportType::LowStockAlert => None,
            _ => Some(parse_period(query)?),
        };
        Ok(Self {
            report_type: query.report_type,
            category: non_all(&query.category),
            item_id: non_all(&query.item_id),
            heading: query
                .school_dept
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| default_heading.to_string()),
            period,
        })
    }

    pub fn title(&self) -> String {
        match &self.period {
            Some(period) => format!(
                "{}  {}  （查詢期間：{}）",
                self.heading,
                self.report_type.title(),
                period.label()
            ),
            None => format!("{}  {}", self.heading, self.report_type.title()),
        }
    }

    fn period(&self) -> AppResult<Period> {
        self.period
            .ok_or_else(|| AppError::bad_request("Report requires a period"))
    }
}

fn non_all(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "all")
        .map(str::to_string)
}

fn parse_period(query: &ReportQuery) -> AppResult<Period> {
    match query.query_mode {
        QueryMode::Daterange => {
            let (Some(start), Some(end)) = (
                query.start_date.as_deref().filter(|s| !s.is_empty()),
                query.end_date.as_deref().filter(|s| !s.is_empty()),
            ) else {
                return Err(AppError::bad_request(
                    "start_date and end_date are required in daterange mode",
                ));
            };
            Period::date_range(parse_date(start)?, parse_date(end)?)
        }
        QueryMode::Month => {
            let (Some(year), Some(month)) = (
                query.year.as_deref().filter(|s| !s.is_empty()),
                query.month.as_deref().filter(|s| !s.is_empty()),
            ) else {
                return Err(AppError::bad_request("year and month are required in month mode"));
            };
            let year = year
                .trim()
                .parse::<i32>()
                .map_err(|_| AppError::bad_request(format!("Invalid year: {}", year)))?;
            let month = month
                .trim()
                .parse::<u32>()
                .map_err(|_| AppError::bad_request(format!("Invalid month: {}", month)))?;
            Period::month(year, month)
        }
    }
}

fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("Invalid date (expected YYYY-MM-DD): {}", s)))
}

// ============================================
// Report tables
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Number(i64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub cells: Vec<Cell>,
    /// Column printed in red
    pub alert_column: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub report_type: ReportType,
    pub title: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<ReportRow>,
    /// Signature labels printed under the stock summary
    pub signatures: Vec<&'static str>,
    pub generated_on: NaiveDate,
}

impl Report {
    pub fn file_stem(&self) -> &'static str {
        self.report_type.as_str()
    }
}

/// Build the report described by `params` from one department database
pub async fn build_report(db: &DepartmentDb, params: &ReportParams) -> AppResult<Report> {
    let rows = match params.report_type {
        ReportType::StockSummary => stock_summary_rows(db, params).await?,
        ReportType::InRecords => record_rows(db, params, RecordKind::In).await?,
        ReportType::OutRecords => record_rows(db, params, RecordKind::Out).await?,
        ReportType::LowStockAlert => low_stock_rows(db, params).await?,
    };
    let headers = match params.report_type {
        ReportType::StockSummary => SUMMARY_HEADERS,
        ReportType::InRecords | ReportType::OutRecords => RECORD_HEADERS,
        ReportType::LowStockAlert => LOW_STOCK_HEADERS,
    };
    let signatures = match params.report_type {
        ReportType::StockSummary => SIGNATURES.to_vec(),
        _ => Vec::new(),
    };

    Ok(Report {
        report_type: params.report_type,
        title: params.title(),
        headers: headers.to_vec(),
        rows,
        signatures,
        generated_on: Utc::now().date_naive(),
    })
}

/// Notes column of a stock summary row, flagged when closing stock is at or
/// below a configured safety level
pub fn summary_note(notes: Option<&str>, safety_stock: i64, closing: i64) -> (String, bool) {
    let notes = notes.unwrap_or_default();
    if is_low_stock(safety_stock, closing) {
        let note = if notes.is_empty() {
            LOW_STOCK_NOTE.to_string()
        } else {
            format!("{}; {}", LOW_STOCK_NOTE, notes)
        };
        (note, true)
    } else {
        (notes.to_string(), false)
    }
}

async fn stock_summary_rows(db: &DepartmentDb, params: &ReportParams) -> AppResult<Vec<ReportRow>> {
    let (month_start, month_end) = params.period()?.summary_month()?;
    let records = db.records();
    let materials = db
        .materials()
        .list_for_report(params.category.as_deref(), params.item_id.as_deref(), false)
        .await?;

    let mut rows = Vec::with_capacity(materials.len());
    for m in materials {
        let opening = records
            .sum_between(RecordKind::In, m.id, None, Some(month_start))
            .await?
            - records
                .sum_between(RecordKind::Out, m.id, None, Some(month_start))
                .await?;
        let monthly_in = records
            .sum_between(RecordKind::In, m.id, Some(month_start), Some(month_end))
            .await?;
        let monthly_out = records
            .sum_between(RecordKind::Out, m.id, Some(month_start), Some(month_end))
            .await?;
        let closing = opening + monthly_in - monthly_out;
        let (note, low) = summary_note(m.notes.as_deref(), m.safety_stock, closing);

        rows.push(ReportRow {
            cells: vec![
                Cell::text(m.item_id),
                Cell::text(m.category),
                Cell::text(m.name),
                Cell::text(m.unit),
                Cell::Number(opening),
                Cell::Number(monthly_in),
                Cell::Number(monthly_out),
                Cell::Number(closing),
                Cell::Number(m.safety_stock),
                Cell::Text(note),
            ],
            alert_column: low.then_some(9),
        });
    }
    Ok(rows)
}

async fn record_rows(
    db: &DepartmentDb,
    params: &ReportParams,
    kind: RecordKind,
) -> AppResult<Vec<ReportRow>> {
    let period = params.period()?;
    let filter = RecordFilter {
        category: params.category.as_deref(),
        item_id: params.item_id.as_deref(),
        from: Some(period.start),
        until: Some(period.end),
        ..Default::default()
    };
    let records = db.records();

    let rows = match kind {
        RecordKind::In => records
            .list_in(&filter)
            .await?
            .into_iter()
            .map(|r| {
                record_row(
                    r.date,
                    r.item_id,
                    r.material_name,
                    r.category,
                    r.quantity,
                    r.source,
                    r.handler,
                )
            })
            .collect(),
        RecordKind::Out => records
            .list_out(&filter)
            .await?
            .into_iter()
            .map(|r| {
                record_row(
                    r.date,
                    r.item_id,
                    r.material_name,
                    r.category,
                    r.quantity,
                    r.department,
                    r.purpose,
                )
            })
            .collect(),
    };
    Ok(rows)
}

fn record_row(
    date: DateTime<Utc>,
    item_id: String,
    name: String,
    category: String,
    quantity: i64,
    origin: Option<String>,
    detail: Option<String>,
) -> ReportRow {
    ReportRow {
        cells: vec![
            Cell::Text(date.format("%Y-%m-%d").to_string()),
            Cell::Text(item_id),
            Cell::Text(name),
            Cell::Text(category),
            Cell::Number(quantity),
            Cell::Text(origin.unwrap_or_default()),
            Cell::Text(detail.unwrap_or_default()),
        ],
        alert_column: None,
    }
}

async fn low_stock_rows(db: &DepartmentDb, params: &ReportParams) -> AppResult<Vec<ReportRow>> {
    let materials = db
        .materials()
        .list_for_report(params.category.as_deref(), params.item_id.as_deref(), true)
        .await?;
    Ok(materials
        .into_iter()
        .map(|m| {
            let gap = m.safety_stock - m.current_stock;
            ReportRow {
                cells: vec![
                    Cell::text(m.item_id),
                    Cell::text(m.category),
                    Cell::text(m.name),
                    Cell::text(m.unit),
                    Cell::Number(m.safety_stock),
                    Cell::Number(m.current_stock),
                    Cell::Number(gap),
                ],
                alert_column: Some(6),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn query(report_type: ReportType) -> ReportQuery {
        ReportQuery {
            report_type,
            ..Default::default()
        }
    }

    #[test]
    fn date_range_covers_whole_end_day() {
        let mut q = query(ReportType::InRecords);
        q.start_date = Some("2024-03-01".into());
        q.end_date = Some("2024-03-15".into());
        let params = ReportParams::from_query(&q, "Dept").unwrap();
        let period = params.period.unwrap();

        assert_eq!(period.start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(period.end, Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap());
        assert_eq!((period.year, period.month), (2024, 3));
        assert_eq!(period.label(), "2024/03/01 - 2024/03/15");
    }

    #[test]
    fn month_mode_spans_calendar_month() {
        let mut q = query(ReportType::StockSummary);
        q.query_mode = QueryMode::Month;
        q.year = Some("2024".into());
        q.month = Some("12".into());
        let period = ReportParams::from_query(&q, "Dept").unwrap().period.unwrap();

        assert_eq!(period.end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(period.label(), "2024年12月");
    }

    #[test]
    fn summary_month_follows_end_date() {
        let period = Period::date_range(
            NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
        )
        .unwrap();
        let (start, end) = period.summary_month().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn missing_period_is_rejected_except_for_low_stock() {
        assert!(matches!(
            ReportParams::from_query(&query(ReportType::StockSummary), "Dept"),
            Err(AppError::BadRequest(_))
        ));
        let mut month = query(ReportType::OutRecords);
        month.query_mode = QueryMode::Month;
        month.year = Some("2024".into());
        assert!(ReportParams::from_query(&month, "Dept").is_err());

        let low = ReportParams::from_query(&query(ReportType::LowStockAlert), "Dept").unwrap();
        assert!(low.period.is_none());
        assert_eq!(low.title(), "Dept  低庫存警示報表");
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let mut q = query(ReportType::InRecords);
        q.start_date = Some("2024/03/01".into());
        q.end_date = Some("2024-03-15".into());
        assert!(ReportParams::from_query(&q, "Dept").is_err());

        let mut m = query(ReportType::InRecords);
        m.query_mode = QueryMode::Month;
        m.year = Some("2024".into());
        m.month = Some("13".into());
        assert!(ReportParams::from_query(&m, "Dept").is_err());
    }

    #[test]
    fn all_filters_mean_no_filter() {
        let mut q = query(ReportType::LowStockAlert);
        q.category = Some("all".into());
        q.item_id = Some("M0002".into());
        q.school_dept = Some("Shop".into());
        let params = ReportParams::from_query(&q, "Dept").unwrap();
        assert_eq!(params.category, None);
        assert_eq!(params.item_id.as_deref(), Some("M0002"));
        assert_eq!(params.heading, "Shop");
    }

    #[test]
    fn low_stock_note_prefixes_existing_notes() {
        assert_eq!(summary_note(Some("shelf A"), 5, 5), ("低庫存; shelf A".to_string(), true));
        assert_eq!(summary_note(None, 5, 2), ("低庫存".to_string(), true));
        assert_eq!(summary_note(Some("shelf A"), 0, 0), ("shelf A".to_string(), false));
        assert_eq!(summary_note(None, 5, 6), (String::new(), false));
    }
}
