use crate::scan::{CisReport, ScanTarget};
use crate::Result;
use async_trait::async_trait;

/// Local image cache the scan engine reads from, e.g. the docker daemon.
#[async_trait]
pub trait ImageCache: Send + Sync {
    /// Pulls an image into the local cache. Failure is non-fatal to a scan;
    /// the image may already be cached.
    async fn pull(&self, image: &str) -> Result<()>;

    /// Removes an image from the local cache to bound disk usage. Failure
    /// is non-fatal.
    async fn remove(&self, image: &str) -> Result<()>;
}

/// The external vulnerability scan engine.
#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// Ensures the vulnerability database is present and current. Called
    /// once per run, before any per-image work; failure aborts the run.
    async fn download_database(&self, kind: &str) -> Result<()>;

    /// Scans one image and returns its per-target findings.
    async fn scan_image(&self, image: &str) -> Result<Vec<ScanTarget>>;

    /// Runs the named compliance benchmark against the cluster.
    async fn cis_scan(&self, benchmark: &str) -> Result<CisReport>;
}
