mod error;

pub use error::ScannerError;

use kubevet_common::diagnostic::Error;
use kubevet_common::Result;
use kubevet_domain::cluster::ClusterClient;
use kubevet_domain::config::ScanConfig;
use kubevet_domain::engine::{ImageCache, ScanEngine};
use kubevet_domain::image::{group_by_image, resolver, ImageGroups};
use kubevet_domain::scan::ScannedImage;
use kubevet_report::{AreaReport, BenchmarkReport, VulnerabilityReport};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Orchestrates a cluster scan: discovers the distinct images in use, fans
/// scan work out over a bounded worker pool and aggregates the results.
pub struct Scanner {
    config: ScanConfig,
    cluster: Arc<dyn ClusterClient>,
    cache: Arc<dyn ImageCache>,
    engine: Arc<dyn ScanEngine>,
}

impl Scanner {
    pub fn new(
        config: ScanConfig,
        cluster: Arc<dyn ClusterClient>,
        cache: Arc<dyn ImageCache>,
        engine: Arc<dyn ScanEngine>,
    ) -> Self {
        Self {
            config,
            cluster,
            cache,
            engine,
        }
    }

    /// Scans every distinct image running in the cluster and folds the
    /// results into an ownership report.
    pub async fn scan(&self) -> Result<VulnerabilityReport> {
        info!("running cluster image scan");
        let containers = self
            .cluster
            .containers_in_namespaces(&self.config.filter_labels)
            .await
            .map_err(|e| Error::new(ScannerError::ClusterEnumeration(e)))?;

        let groups = group_by_image(&containers);
        let scanned_images = self.scan_images(groups).await?;

        info!("generating vulnerability report");
        let report = AreaReport::new(&self.config.area_labels, &self.config.teams_labels);
        report
            .generate_vulnerability_report(scanned_images)
            .map_err(|e| Error::new(ScannerError::Report(e)))
    }

    /// Produces one `ScannedImage` per image group. Only the database
    /// download is fatal; every per-image failure is logged and captured on
    /// the affected result instead of aborting siblings.
    pub async fn scan_images(&self, groups: ImageGroups) -> Result<Vec<ScannedImage>> {
        self.engine
            .download_database("image")
            .await
            .map_err(|e| Error::new(ScannerError::DatabaseDownload(e)))?;

        let workers = self.config.effective_workers();
        info!(images = groups.len(), workers, "scanning images");

        let results: Arc<Mutex<Vec<ScannedImage>>> =
            Arc::new(Mutex::new(Vec::with_capacity(groups.len())));
        let mut tasks = JoinSet::new();

        for (image_name, containers) in groups {
            // Images beyond the worker count queue until a slot frees.
            while tasks.len() >= workers {
                Self::join_one(&mut tasks).await;
            }

            let resolved_name =
                match resolver::resolve(&image_name, &self.config.image_name_replacement) {
                    Ok(name) => name,
                    Err(e) => {
                        error!(
                            image = %image_name,
                            rules = %self.config.image_name_replacement,
                            error = %e,
                            "image name resolution failed, scanning under the original name"
                        );
                        image_name.clone()
                    }
                };

            let cache = Arc::clone(&self.cache);
            let engine = Arc::clone(&self.engine);
            let results = Arc::clone(&results);
            tasks.spawn(async move {
                info!(image = %resolved_name, "worker processing image");

                // The image may already be cached locally, so a failed pull
                // does not stop the scan.
                if let Err(e) = cache.pull(&resolved_name).await {
                    error!(image = %resolved_name, error = %e, "image pull failed");
                }

                let (targets, scan_error) = match engine.scan_image(&resolved_name).await {
                    Ok(targets) => (targets, None),
                    Err(e) => {
                        let message = format!("error scanning image {resolved_name}: {e}");
                        error!(image = %resolved_name, error = %e, "image scan failed");
                        (Vec::new(), Some(message))
                    }
                };

                if let Err(e) = cache.remove(&resolved_name).await {
                    error!(image = %resolved_name, error = %e, "image removal failed");
                }

                let scanned = ScannedImage::new(resolved_name, containers, targets, scan_error);
                results.lock().await.push(scanned);
            });
        }

        while !tasks.is_empty() {
            Self::join_one(&mut tasks).await;
        }

        let mut results = results.lock().await;
        Ok(std::mem::take(&mut *results))
    }

    async fn join_one(tasks: &mut JoinSet<()>) {
        if let Some(Err(e)) = tasks.join_next().await {
            // A panicked worker loses its one image; the run carries on.
            error!(error = %e, "scan worker task failed");
        }
    }

    /// Runs the named compliance benchmark against the cluster. Unlike the
    /// per-image flow, any engine failure here is fatal.
    pub async fn cis_scan(&self, benchmark: &str) -> Result<BenchmarkReport> {
        info!(benchmark, "running cluster compliance benchmark");
        let summary = self.engine.cis_scan(benchmark).await.map_err(|e| {
            Error::new(ScannerError::Compliance {
                benchmark: benchmark.to_string(),
                source: e,
            })
        })?;

        info!(benchmark, "generating compliance benchmark report");
        let report = AreaReport::new(&self.config.area_labels, &self.config.teams_labels);
        Ok(report.generate_benchmark_report(benchmark, summary))
    }
}
