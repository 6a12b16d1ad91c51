//! Report history: store contract and in-memory implementation
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::RwLock;

use crate::data_model::{BoundingBox, ReportRecord};
use crate::error::HistoryError;

/// Query over stored reports. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub network_identity: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub area: Option<BoundingBox>,
    pub verified_only: bool,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.network_identity = Some(identity.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn within(mut self, area: BoundingBox) -> Self {
        self.area = Some(area);
        self
    }

    pub fn verified_only(mut self) -> Self {
        self.verified_only = true;
        self
    }

    pub fn matches(&self, record: &ReportRecord) -> bool {
        if let Some(identity) = &self.network_identity {
            if record.network_identity.as_deref() != Some(identity.as_str()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        if let Some(area) = &self.area {
            match &record.coordinates {
                Some(point) if area.contains(point) => {}
                _ => return false,
            }
        }
        if self.verified_only && !record.verified {
            return false;
        }
        true
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Matching records, newest first, at most `limit` of them.
    async fn find_recent(
        &self,
        filter: &HistoryFilter,
        limit: Option<usize>,
    ) -> Result<Vec<ReportRecord>, HistoryError>;

    async fn insert(&self, record: ReportRecord) -> Result<(), HistoryError>;
}

/// Process-local history, newest record last.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: RwLock<Vec<ReportRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ReportRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn find_recent(
        &self,
        filter: &HistoryFilter,
        limit: Option<usize>,
    ) -> Result<Vec<ReportRecord>, HistoryError> {
        let records = self
            .records
            .read()
            .map_err(|e| HistoryError::Unavailable(e.to_string()))?;

        let mut found: Vec<ReportRecord> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn insert(&self, record: ReportRecord) -> Result<(), HistoryError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| HistoryError::Unavailable(e.to_string()))?;
        tracing::debug!(id = %record.id, "report stored");
        records.push(record);
        Ok(())
    }
}
