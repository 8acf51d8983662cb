//! Process-lifetime usage counters.
//!
//! Counters live for the whole process and start at zero; there is no
//! persistence and no teardown. The blocked-domain frequency table is
//! bounded: once it exceeds [`TOP_DOMAINS_CAP`] distinct domains it is
//! resorted by count and truncated, dropping the low-frequency tail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

/// Maximum number of distinct domains kept in the blocked-domain table.
const TOP_DOMAINS_CAP: usize = 100;

/// Number of entries reported in a snapshot's top list.
const TOP_LIST_LEN: usize = 10;

/// Tracks query counters and the most frequently blocked domains.
pub struct StatsTracker {
    total: AtomicU64,
    blocked: AtomicU64,
    allowed: AtomicU64,
    started_at: Instant,
    top_blocked: Mutex<HashMap<String, u64>>,
}

/// Point-in-time view of the tracker, shaped for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_queries: u64,
    pub blocked_queries: u64,
    pub allowed_queries: u64,
    pub block_rate_percent: f64,
    pub uptime_seconds: u64,
    pub top10: Vec<BlockedDomain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedDomain {
    pub domain: String,
    pub count: u64,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            started_at: Instant::now(),
            top_blocked: Mutex::new(HashMap::new()),
        }
    }

    /// Count a received query, before its outcome is known.
    pub fn record_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a query answered from cache or upstream.
    pub fn record_allowed(&self) {
        self.allowed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a blocked query and bump the domain's frequency.
    pub fn record_blocked(&self, domain: &str) {
        self.blocked.fetch_add(1, Ordering::Relaxed);

        let mut top = self.top_blocked.lock();
        *top.entry(domain.to_string()).or_insert(0) += 1;
        if top.len() > TOP_DOMAINS_CAP {
            trim(&mut top);
        }
    }

    /// Build a read-only snapshot of the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let blocked = self.blocked.load(Ordering::Relaxed);
        let allowed = self.allowed.load(Ordering::Relaxed);

        let block_rate_percent = if total == 0 {
            0.0
        } else {
            (blocked as f64 / total as f64 * 10_000.0).round() / 100.0
        };

        let mut top10: Vec<BlockedDomain> = {
            let top = self.top_blocked.lock();
            top.iter()
                .map(|(domain, &count)| BlockedDomain {
                    domain: domain.clone(),
                    count,
                })
                .collect()
        };
        sort_by_count(&mut top10);
        top10.truncate(TOP_LIST_LEN);

        StatsSnapshot {
            total_queries: total,
            blocked_queries: blocked,
            allowed_queries: allowed,
            block_rate_percent,
            uptime_seconds: self.started_at.elapsed().as_secs(),
            top10,
        }
    }

    #[cfg(test)]
    fn tracked_domains(&self) -> usize {
        self.top_blocked.lock().len()
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Resort the frequency table and drop everything past the cap.
///
/// Only runs when the cap is crossed, so the O(n log n) sort is paid
/// once per overflow rather than on every blocked query.
fn trim(top: &mut HashMap<String, u64>) {
    let mut entries: Vec<BlockedDomain> = top
        .drain()
        .map(|(domain, count)| BlockedDomain { domain, count })
        .collect();
    sort_by_count(&mut entries);
    entries.truncate(TOP_DOMAINS_CAP);
    top.extend(entries.into_iter().map(|entry| (entry.domain, entry.count)));
}

fn sort_by_count(entries: &mut [BlockedDomain]) {
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.domain.cmp(&b.domain)));
}
