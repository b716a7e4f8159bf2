//! Derived metrics for the summary table.

#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

use crate::types::SimRecord;

/// Per-run figures shown by the summarizer, summed over all cores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    pub name: String,
    pub loads: u64,
    pub stores: u64,
    pub hits: u64,
    pub misses: u64,
    pub exec_cycles: u64,
    pub bus_bytes: u64,
}

impl RunMetrics {
    pub fn from_record(record: &SimRecord) -> Self {
        Self {
            name: record.name.clone(),
            loads: sum(&record.per_core_loads),
            stores: sum(&record.per_core_stores),
            hits: sum(&record.per_core_hits),
            misses: sum(&record.per_core_misses),
            exec_cycles: record.overall_execution_cycles,
            bus_bytes: record.bus_data_traffic_bytes,
        }
    }

    /// Hits plus misses.
    pub const fn total_accesses(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }

    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }
}

fn sum(per_core: &[u64]) -> u64 {
    per_core.iter().fold(0, |acc, &n| acc.saturating_add(n))
}

/// `hits / (hits + misses)`, or 0 when there were no accesses.
#[inline]
#[must_use]
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = u128::from(hits) + u128::from(misses);
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
