//! Report query parameters

use serde::{Deserialize, Serialize};

/// Which report to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[default]
    StockSummary,
    InRecords,
    OutRecords,
    LowStockAlert,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::StockSummary => "stock_summary",
            ReportType::InRecords => "in_records",
            ReportType::OutRecords => "out_records",
            ReportType::LowStockAlert => "low_stock_alert",
        }
    }

    /// Heading printed on the report
    pub fn title(&self) -> &'static str {
        match self {
            ReportType::StockSummary => "庫存摘要報表",
            ReportType::InRecords => "入庫明細查詢",
            ReportType::OutRecords => "出庫明細查詢",
            ReportType::LowStockAlert => "低庫存警示報表",
        }
    }
}

/// How the reporting period is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Daterange,
    Month,
}

/// Raw `?query` of the report endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub report_type: ReportType,
    #[serde(default)]
    pub query_mode: QueryMode,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub school_dept: Option<String>,
}
