use kubevet_common::diagnostic::{Diagnosable, Error};

/// Fatal failures that abort a whole run. Per-image failures never surface
/// here; they are captured on the affected `ScannedImage` instead.
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("failed to list containers in the cluster: {0}")]
    ClusterEnumeration(#[source] Error),
    #[error("failed to download the vulnerability database: {0}")]
    DatabaseDownload(#[source] Error),
    #[error("compliance benchmark '{benchmark}' failed: {source}")]
    Compliance {
        benchmark: String,
        #[source]
        source: Error,
    },
    #[error("failed to generate the vulnerability report: {0}")]
    Report(#[source] Error),
}

impl Diagnosable for ScannerError {
    fn code(&self) -> String {
        match self {
            Self::ClusterEnumeration(_) => "SCAN_CLUSTER_LIST_FAILED".to_string(),
            Self::DatabaseDownload(_) => "SCAN_DB_DOWNLOAD_FAILED".to_string(),
            Self::Compliance { .. } => "SCAN_COMPLIANCE_FAILED".to_string(),
            Self::Report(_) => "SCAN_REPORT_FAILED".to_string(),
        }
    }
    fn suggestion(&self) -> Option<String> {
        match self {
            Self::ClusterEnumeration(_) => {
                Some("Check cluster connectivity and the filter label selector".to_string())
            }
            Self::DatabaseDownload(_) => {
                Some("The scan engine needs network access to fetch its database".to_string())
            }
            Self::Compliance { .. } => {
                Some("Check that the benchmark name is one the scan engine knows".to_string())
            }
            Self::Report(_) => None,
        }
    }
}
