
use crate::cluster::ContainerSummary;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One finding reported by the scan engine. Field names follow the engine's
/// JSON output, so the raw results round-trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Vulnerability {
    #[serde(rename = "VulnerabilityID")]
    pub vulnerability_id: String,
    pub pkg_name: String,
    pub installed_version: String,
    pub fixed_version: String,
    pub severity: String,
    pub title: String,
    pub description: String,
    pub layer: Option<Layer>,
}

/// The image layer a finding originates from, when the engine reports one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Layer {
    pub digest: String,
    #[serde(rename = "DiffID")]
    pub diff_id: String,
}

/// One unit of an image's scan output, e.g. the OS package set or a
/// language-specific dependency manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScanTarget {
    pub target: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Outcome of a cluster compliance benchmark, in the engine's summary shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CisReport {
    #[serde(rename = "ID")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub version: String,
    pub summary_controls: Vec<CisControl>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CisControl {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub severity: String,
    pub total_fail: Option<u64>,
}

/// Severity histogram and weighted score derived from one image's findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilitySummary {
    /// Number of containers running the image, regardless of scan outcome.
    pub container_count: usize,
    pub severity_score: u64,
    /// Always carries all five severity keys, zero-filled when absent.
    pub total_by_severity: BTreeMap<Severity, u64>,
}

impl VulnerabilitySummary {
    pub fn from_targets(targets: &[ScanTarget], container_count: usize) -> Self {
        let mut total_by_severity: BTreeMap<Severity, u64> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();

        for target in targets {
            for vulnerability in &target.vulnerabilities {
                // Severity strings outside the five known levels count as
                // UNKNOWN rather than being dropped.
                let severity = vulnerability.severity.parse().unwrap_or_else(|_| {
                    debug!(
                        severity = %vulnerability.severity,
                        id = %vulnerability.vulnerability_id,
                        "unmapped severity level, counting as UNKNOWN"
                    );
                    Severity::Unknown
                });
                *total_by_severity.entry(severity).or_insert(0) += 1;
            }
        }

        let severity_score = total_by_severity
            .iter()
            .map(|(severity, count)| count * severity.weight())
            .sum();

        Self {
            container_count,
            severity_score,
            total_by_severity,
        }
    }
}

/// The complete scan result for one distinct image. Built exactly once per
/// image group, after its scan attempt finished, and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedImage {
    /// The name the image was actually scanned under (post-resolution).
    pub image_name: String,
    /// The containers mapped to the image, as discovered in the cluster.
    pub containers: Vec<ContainerSummary>,
    pub targets: Vec<ScanTarget>,
    /// Set when the scan itself failed; the image still appears in the
    /// report with empty findings.
    pub scan_error: Option<String>,
    pub summary: VulnerabilitySummary,
}

impl ScannedImage {
    pub fn new(
        image_name: impl Into<String>,
        containers: Vec<ContainerSummary>,
        targets: Vec<ScanTarget>,
        scan_error: Option<String>,
    ) -> Self {
        let summary = VulnerabilitySummary::from_targets(&targets, containers.len());
        Self {
            image_name: image_name.into(),
            containers,
            targets,
            scan_error,
            summary,
        }
    }
}
