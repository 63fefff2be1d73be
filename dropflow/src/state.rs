use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dropflow_filter::Verdict;

/// Live counters for the running filter.
///
/// Scalar totals are plain atomics; per-port drop counts live in a DashMap
/// so the replay path and the API can touch them concurrently without a
/// global lock. The filter core itself stays stateless -- everything here
/// belongs to the hosting agent.
pub struct FilterStats {
    pub frames_total: AtomicU64,
    pub passed_total: AtomicU64,
    pub dropped_total: AtomicU64,
    /// Drop counts keyed by the configured port the frame matched.
    pub drops_by_port: DashMap<u16, u64>,
}

impl FilterStats {
    pub fn new() -> Self {
        Self {
            frames_total: AtomicU64::new(0),
            passed_total: AtomicU64::new(0),
            dropped_total: AtomicU64::new(0),
            drops_by_port: DashMap::new(),
        }
    }

    /// Record one verdict. For drops, `matched_port` names the configured
    /// port the frame matched (best-effort: the control plane may have
    /// rewritten the slot since the verdict was produced).
    pub fn record(&self, verdict: Verdict, matched_port: Option<u16>) {
        self.frames_total.fetch_add(1, Ordering::Relaxed);
        match verdict {
            Verdict::Pass => {
                self.passed_total.fetch_add(1, Ordering::Relaxed);
            }
            Verdict::Drop => {
                self.dropped_total.fetch_add(1, Ordering::Relaxed);
                if let Some(port) = matched_port {
                    *self.drops_by_port.entry(port).or_insert(0) += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_pass() {
        let stats = FilterStats::new();
        stats.record(Verdict::Pass, None);
        stats.record(Verdict::Pass, None);

        assert_eq!(stats.frames_total.load(Ordering::Relaxed), 2);
        assert_eq!(stats.passed_total.load(Ordering::Relaxed), 2);
        assert_eq!(stats.dropped_total.load(Ordering::Relaxed), 0);
        assert!(stats.drops_by_port.is_empty());
    }

    #[test]
    fn test_record_drop_counts_per_port() {
        let stats = FilterStats::new();
        stats.record(Verdict::Drop, Some(4040));
        stats.record(Verdict::Drop, Some(4040));
        stats.record(Verdict::Drop, Some(8080));
        stats.record(Verdict::Pass, None);

        assert_eq!(stats.frames_total.load(Ordering::Relaxed), 4);
        assert_eq!(stats.passed_total.load(Ordering::Relaxed), 1);
        assert_eq!(stats.dropped_total.load(Ordering::Relaxed), 3);
        assert_eq!(*stats.drops_by_port.get(&4040).unwrap(), 2);
        assert_eq!(*stats.drops_by_port.get(&8080).unwrap(), 1);
    }

    #[test]
    fn test_record_drop_without_port_still_counts() {
        let stats = FilterStats::new();
        stats.record(Verdict::Drop, None);

        assert_eq!(stats.dropped_total.load(Ordering::Relaxed), 1);
        assert!(stats.drops_by_port.is_empty());
    }
}
