use async_trait::async_trait;
use kubevet_common::diagnostic::{Diagnosable, Error};
use kubevet_common::Result;
use kubevet_domain::engine::ScanEngine;
use kubevet_domain::scan::{CisReport, ScanTarget};
use serde::Deserialize;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum TrivyError {
    #[error("failed to run trivy: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("trivy exited with {status}: {stderr}")]
    CommandFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("trivy did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("failed to parse trivy output: {0}")]
    Parse(#[source] serde_json::Error),
}

impl Diagnosable for TrivyError {
    fn code(&self) -> String {
        match self {
            Self::Spawn(_) => "TRIVY_NOT_AVAILABLE".to_string(),
            Self::CommandFailed { .. } => "TRIVY_COMMAND_FAILED".to_string(),
            Self::TimedOut(_) => "TRIVY_TIMEOUT".to_string(),
            Self::Parse(_) => "TRIVY_OUTPUT_UNPARSEABLE".to_string(),
        }
    }
    fn suggestion(&self) -> Option<String> {
        match self {
            Self::Spawn(_) => {
                Some("Check that the trivy CLI is installed and on PATH".to_string())
            }
            Self::TimedOut(_) => {
                Some("Raise the per-image scan timeout for large images".to_string())
            }
            Self::Parse(_) => {
                Some("The installed trivy version may emit an unexpected JSON shape".to_string())
            }
            Self::CommandFailed { .. } => None,
        }
    }
}

/// Envelope of `trivy ... --format json` output.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TrivyOutput {
    results: Vec<ScanTarget>,
}

/// Scan engine driving the trivy CLI. Carries the severity filter and the
/// per-scan timeout from configuration.
#[derive(Debug, Clone)]
pub struct TrivyClient {
    program: String,
    severity: String,
    timeout: Duration,
}

impl TrivyClient {
    pub fn new(severity: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: "trivy".to_string(),
            severity: severity.into(),
            timeout,
        }
    }

    /// Runs the engine CLI, capturing stdout. With a deadline the child is
    /// killed when it expires; without one the invocation runs to completion.
    async fn run(&self, args: &[&str], deadline: Option<Duration>) -> Result<Vec<u8>> {
        debug!(?args, "invoking trivy");
        let invocation = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output();
        let output = match deadline {
            Some(limit) => timeout(limit, invocation)
                .await
                .map_err(|_| Error::new(TrivyError::TimedOut(limit)))?,
            None => invocation.await,
        }
        .map_err(|e| Error::new(TrivyError::Spawn(e)))?;

        if !output.status.success() {
            return Err(Error::new(TrivyError::CommandFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl ScanEngine for TrivyClient {
    // A cold database download can take minutes, so it is not subject to
    // the per-scan timeout.
    async fn download_database(&self, kind: &str) -> Result<()> {
        info!(kind, "downloading trivy vulnerability database");
        self.run(&[kind, "--download-db-only"], None).await?;
        Ok(())
    }

    async fn scan_image(&self, image: &str) -> Result<Vec<ScanTarget>> {
        let stdout = self
            .run(
                &[
                    "image",
                    "--severity",
                    &self.severity,
                    "--format",
                    "json",
                    "--skip-db-update",
                    image,
                ],
                Some(self.timeout),
            )
            .await?;
        let output: TrivyOutput =
            serde_json::from_slice(&stdout).map_err(|e| Error::new(TrivyError::Parse(e)))?;
        Ok(output.results)
    }

    async fn cis_scan(&self, benchmark: &str) -> Result<CisReport> {
        let stdout = self
            .run(
                &[
                    "k8s",
                    "cluster",
                    "--compliance",
                    benchmark,
                    "--report",
                    "summary",
                    "--format",
                    "json",
                ],
                Some(self.timeout),
            )
            .await?;
        serde_json::from_slice(&stdout).map_err(|e| Error::new(TrivyError::Parse(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubevet_domain::scan::CisControl;

    fn client_running(program: &str, timeout: Duration) -> TrivyClient {
        let mut client = TrivyClient::new("HIGH", timeout);
        client.program = program.to_string();
        client
    }

    #[tokio::test]
    async fn expired_deadline_kills_the_child_process() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let script = format!("sleep 0.5 && touch {}", marker.display());

        let client = client_running("sh", Duration::from_millis(50));
        let err = client
            .run(&["-c", &script], Some(client.timeout))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TRIVY_TIMEOUT");

        // Give a surviving child ample time to reach the touch.
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(
            !marker.exists(),
            "child process outlived the expired deadline"
        );
    }

    #[tokio::test]
    async fn run_without_deadline_ignores_the_scan_timeout() {
        let client = client_running("sh", Duration::from_millis(50));
        let stdout = client
            .run(&["-c", "sleep 0.2 && echo ok"], None)
            .await
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&stdout).trim(), "ok");
    }

    #[test]
    fn parses_image_scan_output() {
        let raw = r#"{
            "SchemaVersion": 2,
            "ArtifactName": "alpine:3.18",
            "Results": [
                {
                    "Target": "alpine:3.18 (alpine 3.18.4)",
                    "Class": "os-pkgs",
                    "Type": "alpine",
                    "Vulnerabilities": [
                        {
                            "VulnerabilityID": "CVE-2023-5363",
                            "PkgName": "libcrypto3",
                            "InstalledVersion": "3.1.3-r0",
                            "FixedVersion": "3.1.4-r0",
                            "Severity": "HIGH",
                            "Title": "openssl: incorrect cipher key and IV length processing",
                            "Description": "A bug has been identified...",
                            "Layer": {
                                "Digest": "sha256:96526aa7",
                                "DiffID": "sha256:cc2447e1"
                            }
                        }
                    ]
                }
            ]
        }"#;

        let output: TrivyOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(output.results.len(), 1);
        let target = &output.results[0];
        assert_eq!(target.kind, "alpine");
        assert_eq!(target.vulnerabilities.len(), 1);
        let finding = &target.vulnerabilities[0];
        assert_eq!(finding.vulnerability_id, "CVE-2023-5363");
        assert_eq!(finding.severity, "HIGH");
        assert_eq!(finding.layer.as_ref().unwrap().diff_id, "sha256:cc2447e1");
    }

    #[test]
    fn parses_scan_output_without_results() {
        let output: TrivyOutput =
            serde_json::from_str(r#"{"SchemaVersion": 2, "ArtifactName": "scratch"}"#).unwrap();
        assert!(output.results.is_empty());
    }

    #[test]
    fn parses_compliance_summary() {
        let raw = r#"{
            "ID": "k8s-cis",
            "Title": "CIS Kubernetes Benchmarks",
            "SummaryControls": [
                {"ID": "1.1.1", "Name": "API server pod file permissions", "Severity": "HIGH", "TotalFail": 2}
            ]
        }"#;
        let report: CisReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.id, "k8s-cis");
        assert_eq!(
            report.summary_controls,
            vec![CisControl {
                id: "1.1.1".to_string(),
                name: "API server pod file permissions".to_string(),
                severity: "HIGH".to_string(),
                total_fail: Some(2),
            }]
        );
    }
}
