//! Non-performing-asset aging. Loan applications carry a days-past-due
//! counter in their extra bag; the summary buckets every application by
//! that counter.

use crate::core::error::Result;
use crate::core::value::FieldValue;
use crate::store::{Record, Store};
use serde::Serialize;
use std::collections::BTreeMap;

pub const BUCKET_LABELS: [&str; 5] = ["current", "1-30", "31-60", "61-90", "90+"];

#[derive(Debug, Clone, Serialize)]
pub struct NpaSummary {
    pub enabled: bool,
    pub buckets: BTreeMap<String, u64>,
    pub total: u64,
}

impl NpaSummary {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            buckets: BTreeMap::new(),
            total: 0,
        }
    }
}

/// Aging bucket for a days-past-due count. Zero and negative counts are
/// current.
pub fn bucket_for(dpd: i64) -> &'static str {
    match dpd {
        i64::MIN..=0 => "current",
        1..=30 => "1-30",
        31..=60 => "31-60",
        61..=90 => "61-90",
        _ => "90+",
    }
}

fn dpd_of(record: &Record) -> i64 {
    match record.extra_data.get("dpd") {
        Some(FieldValue::Number(n)) => *n as i64,
        Some(FieldValue::Text(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Bucket every loan application by days past due. All five buckets are
/// present in the result even when empty.
pub async fn summarize(store: &Store) -> Result<NpaSummary> {
    let table = store.table("loanapplication")?;
    let guard = table.read().await;

    let mut buckets: BTreeMap<String, u64> =
        BUCKET_LABELS.iter().map(|l| (l.to_string(), 0)).collect();
    let mut total = 0;
    for row in guard.rows() {
        *buckets
            .entry(bucket_for(dpd_of(row)).to_string())
            .or_insert(0) += 1;
        total += 1;
    }
    Ok(NpaSummary {
        enabled: true,
        buckets,
        total,
    })
}
