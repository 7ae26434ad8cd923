use kubevet_common::Result;
use kubevet_domain::scan::{CisReport, ScannedImage};
use kubevet_domain::severity::Severity;
use serde::Serialize;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tracing::info;

/// Bucket for containers whose pods carry neither ownership label.
const UNATTRIBUTED: &str = "unattributed";

/// Folds per-image scan results into a cluster-wide report grouped by the
/// area and team ownership labels.
pub struct AreaReport {
    area_label_name: String,
    team_label_name: String,
}

#[derive(Debug, Serialize)]
pub struct VulnerabilityReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    /// Total distinct images scanned, including failed scans.
    pub image_count: usize,
    pub areas: BTreeMap<String, AreaSummary>,
}

#[derive(Debug, Default, Serialize)]
pub struct AreaSummary {
    pub teams: BTreeMap<String, TeamSummary>,
}

#[derive(Debug, Default, Serialize)]
pub struct TeamSummary {
    pub image_count: usize,
    /// Containers of this team running the listed images.
    pub container_count: usize,
    pub total_by_severity: BTreeMap<Severity, u64>,
    /// Sorted by severity score, worst first.
    pub images: Vec<ScannedImage>,
}

#[derive(Debug, Serialize)]
pub struct BenchmarkReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub benchmark: String,
    pub summary: CisReport,
}

impl AreaReport {
    pub fn new(area_label_name: impl Into<String>, team_label_name: impl Into<String>) -> Self {
        Self {
            area_label_name: area_label_name.into(),
            team_label_name: team_label_name.into(),
        }
    }

    /// Builds the cluster report. An image is listed under every
    /// (area, team) pair its containers belong to.
    pub fn generate_vulnerability_report(
        &self,
        scanned_images: Vec<ScannedImage>,
    ) -> Result<VulnerabilityReport> {
        let image_count = scanned_images.len();
        let mut areas: BTreeMap<String, AreaSummary> = BTreeMap::new();

        for image in scanned_images {
            for ((area, team), matching_containers) in self.owners_of(&image) {
                let team_summary = areas
                    .entry(area)
                    .or_default()
                    .teams
                    .entry(team)
                    .or_default();
                team_summary.image_count += 1;
                team_summary.container_count += matching_containers;
                for (severity, count) in &image.summary.total_by_severity {
                    *team_summary.total_by_severity.entry(*severity).or_insert(0) += count;
                }
                team_summary.images.push(image.clone());
            }
        }

        for area in areas.values_mut() {
            for team in area.teams.values_mut() {
                team.images
                    .sort_by(|a, b| b.summary.severity_score.cmp(&a.summary.severity_score));
            }
        }

        info!(images = image_count, areas = areas.len(), "vulnerability report assembled");
        Ok(VulnerabilityReport {
            generated_at: OffsetDateTime::now_utc(),
            image_count,
            areas,
        })
    }

    /// Wraps a compliance benchmark outcome in the report envelope.
    pub fn generate_benchmark_report(
        &self,
        benchmark: impl Into<String>,
        summary: CisReport,
    ) -> BenchmarkReport {
        BenchmarkReport {
            generated_at: OffsetDateTime::now_utc(),
            benchmark: benchmark.into(),
            summary,
        }
    }

    /// The distinct (area, team) owners of an image, with the number of the
    /// image's containers that belong to each.
    fn owners_of(&self, image: &ScannedImage) -> BTreeMap<(String, String), usize> {
        let mut owners: BTreeMap<(String, String), usize> = BTreeMap::new();
        for container in &image.containers {
            let area = container
                .labels
                .get(&self.area_label_name)
                .cloned()
                .unwrap_or_else(|| UNATTRIBUTED.to_string());
            let team = container
                .labels
                .get(&self.team_label_name)
                .cloned()
                .unwrap_or_else(|| UNATTRIBUTED.to_string());
            *owners.entry((area, team)).or_insert(0) += 1;
        }
        if owners.is_empty() {
            owners.insert((UNATTRIBUTED.to_string(), UNATTRIBUTED.to_string()), 0);
        }
        owners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubevet_domain::cluster::ContainerSummary;
    use kubevet_domain::scan::{ScanTarget, Vulnerability};

    fn container(name: &str, image: &str, area: Option<&str>, team: Option<&str>) -> ContainerSummary {
        let mut labels = BTreeMap::new();
        if let Some(area) = area {
            labels.insert("area".to_string(), area.to_string());
        }
        if let Some(team) = team {
            labels.insert("team".to_string(), team.to_string());
        }
        ContainerSummary {
            container_name: name.to_string(),
            pod_name: format!("{name}-pod"),
            namespace: "default".to_string(),
            image: image.to_string(),
            labels,
        }
    }

    fn critical_target() -> ScanTarget {
        ScanTarget {
            target: "os".to_string(),
            kind: "alpine".to_string(),
            vulnerabilities: vec![Vulnerability {
                vulnerability_id: "CVE-1".to_string(),
                severity: "CRITICAL".to_string(),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn groups_images_by_ownership_labels() {
        let scanned = vec![
            ScannedImage::new(
                "nginx:1.25",
                vec![container("web", "nginx:1.25", Some("platform"), Some("ingress"))],
                vec![critical_target()],
                None,
            ),
            ScannedImage::new(
                "redis:7",
                vec![container("cache", "redis:7", Some("platform"), Some("storage"))],
                Vec::new(),
                None,
            ),
        ];

        let report = AreaReport::new("area", "team")
            .generate_vulnerability_report(scanned)
            .unwrap();

        assert_eq!(report.image_count, 2);
        let platform = &report.areas["platform"];
        assert_eq!(platform.teams.len(), 2);
        let ingress = &platform.teams["ingress"];
        assert_eq!(ingress.image_count, 1);
        assert_eq!(ingress.container_count, 1);
        assert_eq!(ingress.total_by_severity[&Severity::Critical], 1);
    }

    #[test]
    fn unlabeled_containers_fall_back_to_unattributed() {
        let scanned = vec![ScannedImage::new(
            "nginx:1.25",
            vec![container("web", "nginx:1.25", None, None)],
            Vec::new(),
            None,
        )];

        let report = AreaReport::new("area", "team")
            .generate_vulnerability_report(scanned)
            .unwrap();
        assert!(report.areas.contains_key(UNATTRIBUTED));
        assert!(report.areas[UNATTRIBUTED].teams.contains_key(UNATTRIBUTED));
    }

    #[test]
    fn image_shared_across_teams_is_listed_under_each() {
        let scanned = vec![ScannedImage::new(
            "nginx:1.25",
            vec![
                container("web-a", "nginx:1.25", Some("platform"), Some("ingress")),
                container("web-b", "nginx:1.25", Some("platform"), Some("storage")),
                container("web-c", "nginx:1.25", Some("platform"), Some("storage")),
            ],
            Vec::new(),
            None,
        )];

        let report = AreaReport::new("area", "team")
            .generate_vulnerability_report(scanned)
            .unwrap();
        let teams = &report.areas["platform"].teams;
        assert_eq!(teams["ingress"].container_count, 1);
        assert_eq!(teams["storage"].container_count, 2);
        assert_eq!(teams["ingress"].image_count, 1);
        assert_eq!(teams["storage"].image_count, 1);
    }

    #[test]
    fn images_are_sorted_worst_first_within_a_team() {
        let scanned = vec![
            ScannedImage::new(
                "clean:1",
                vec![container("a", "clean:1", Some("platform"), Some("ingress"))],
                Vec::new(),
                None,
            ),
            ScannedImage::new(
                "vulnerable:1",
                vec![container("b", "vulnerable:1", Some("platform"), Some("ingress"))],
                vec![critical_target()],
                None,
            ),
        ];

        let report = AreaReport::new("area", "team")
            .generate_vulnerability_report(scanned)
            .unwrap();
        let images = &report.areas["platform"].teams["ingress"].images;
        assert_eq!(images[0].image_name, "vulnerable:1");
        assert_eq!(images[1].image_name, "clean:1");
    }

    #[test]
    fn benchmark_report_carries_the_benchmark_name() {
        let report = AreaReport::new("area", "team").generate_benchmark_report(
            "k8s-cis",
            CisReport {
                id: "k8s-cis".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(report.benchmark, "k8s-cis");
        assert_eq!(report.summary.id, "k8s-cis");
    }
}
