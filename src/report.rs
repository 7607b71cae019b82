//! Revenue aggregation over validated operations.
//!
//! The split is a global policy: the per-agent `commission_rate` stored on
//! users is not consulted here.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::{
    auth::Principal,
    error::{AppError, AppResult},
    models::{DateRange, OperationDetail, OperationFilter, OperationStatus},
    store::Store,
};

pub const AGENTS_SHARE_RATIO: f64 = 0.6;
pub const SALON_SHARE_RATIO: f64 = 0.4;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub total: f64,
    pub salon_share: f64,
    pub agents_share: f64,
    pub operation_count: usize,
    pub operations: Vec<OperationDetail>,
}

impl Report {
    pub fn from_operations(operations: Vec<OperationDetail>) -> Self {
        let total = operations
            .iter()
            .fold(0.0, |sum, row| sum + row.operation.price_charged);
        let agents_share = total * AGENTS_SHARE_RATIO;
        // The salon keeps the remainder so both shares add back to `total`.
        let salon_share = total - agents_share;

        Self {
            total,
            salon_share,
            agents_share,
            operation_count: operations.len(),
            operations,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportQuery {
    pub range: DateRange,
    pub agent_id: Option<i64>,
}

#[derive(Clone)]
pub struct ReportEngine {
    store: Arc<dyn Store>,
}

impl ReportEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Agents are always narrowed to their own figures, whatever they ask for.
    pub async fn build_report(
        &self,
        principal: &Principal,
        query: ReportQuery,
    ) -> AppResult<Report> {
        let agent_id = if principal.is_admin() {
            query.agent_id
        } else {
            Some(principal.id)
        };

        let filter = OperationFilter {
            status: Some(OperationStatus::Validated),
            agent_id,
            range: query.range,
        };
        let operations = self.store.list_operations(&filter).await?;
        Ok(Report::from_operations(operations))
    }
}

/// Which side of a range a caller-supplied bound sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC, or a bare
/// date covering the whole day.
pub fn parse_bound(raw: &str, bound: Bound) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{raw}'")))?;
    let naive = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_micro_opt(23, 59, 59, 999_999),
    };
    naive
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid date '{raw}'")))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub fn parse_range(start: Option<&str>, end: Option<&str>) -> AppResult<DateRange> {
    Ok(DateRange {
        start: non_empty(start)
            .map(|raw| parse_bound(raw, Bound::Start))
            .transpose()?,
        end: non_empty(end)
            .map(|raw| parse_bound(raw, Bound::End))
            .transpose()?,
    })
}
