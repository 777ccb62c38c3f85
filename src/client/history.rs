//! Rolling transaction history
//!
//! The scan client keeps the most recent movements in a local JSON file,
//! newest first and capped at [`HISTORY_LIMIT`] entries.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockroom_types::{RecordKind, RecordResponse};
use tracing::warn;

pub const HISTORY_LIMIT: usize = 50;

/// Operator name recorded when the client does not know who is scanning
pub const DEFAULT_OPERATOR: &str = "使用者";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub item_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub quantity: i64,
    pub operator: String,
}

impl HistoryEntry {
    pub fn from_response(response: &RecordResponse, operator: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis(),
            timestamp: now,
            item_id: response.material.item_id.clone(),
            name: response.material.name.clone(),
            kind: response.record.kind,
            quantity: response.record.quantity,
            operator: operator.unwrap_or(DEFAULT_OPERATOR).to_string(),
        }
    }
}

#[derive(Debug)]
pub struct TransactionHistory {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl TransactionHistory {
    /// Load the history at `path`. Missing or unreadable files start empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("History file {} is corrupt, starting empty: {}", path.display(), e);
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prepend an entry, drop the oldest beyond the limit and persist
    pub fn push(&mut self, entry: HistoryEntry) -> anyhow::Result<()> {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
        self.save()
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        self.save()
    }

    fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&self.entries)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing history {}", self.path.display()))
    }
}
