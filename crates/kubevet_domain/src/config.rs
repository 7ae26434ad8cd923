use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Process-wide scan settings. Built once before a run starts and never
/// mutated while workers are scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub log_level: String,
    /// Upper bound on concurrently running scan workers.
    pub workers: usize,
    /// Comma-separated `match|replacement` image rewrite rules.
    pub image_name_replacement: String,
    /// Label holding the owning area of a workload.
    pub area_labels: String,
    /// Label holding the owning team of a workload.
    pub teams_labels: String,
    /// Label selector narrowing which pods get scanned.
    pub filter_labels: String,
    /// Severities passed through to the scan engine.
    pub severity: String,
    pub scan_image_timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            workers: 4,
            image_name_replacement: String::new(),
            area_labels: "area".to_string(),
            teams_labels: "team".to_string(),
            filter_labels: String::new(),
            severity: "CRITICAL,HIGH,MEDIUM,LOW,UNKNOWN".to_string(),
            scan_image_timeout: Duration::from_secs(300),
        }
    }
}

impl ScanConfig {
    /// Worker count actually used for dispatch. A misconfigured zero is
    /// clamped to one instead of stalling the pool.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            warn!("configured worker count is 0, clamping to 1");
            1
        } else {
            self.workers
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_clamps_to_one() {
        let config = ScanConfig {
            workers: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_workers(), 1);
    }

    #[test]
    fn positive_worker_count_is_used_as_is() {
        let config = ScanConfig {
            workers: 8,
            ..Default::default()
        };
        assert_eq!(config.effective_workers(), 8);
    }
}
