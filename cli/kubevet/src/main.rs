use clap::{Parser, Subcommand};
use kubevet_common::telemetry;
use kubevet_domain::config::ScanConfig;
use kubevet_infra_docker::DockerCli;
use kubevet_infra_k8s::KubeClusterClient;
use kubevet_infra_trivy::TrivyClient;
use kubevet_scanner::Scanner;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "kubevet",
    version,
    about = "Scans the images running in a Kubernetes cluster for known vulnerabilities"
)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan every distinct image in the cluster and print the report as JSON
    Scan {
        /// Number of concurrent scan workers
        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// Comma-separated image rewrite rules, each 'match|replacement'
        #[arg(long, default_value = "")]
        image_name_replacement: String,

        /// Label holding the owning area of a workload
        #[arg(long, default_value = "area")]
        area_labels: String,

        /// Label holding the owning team of a workload
        #[arg(long, default_value = "team")]
        teams_labels: String,

        /// Label selector narrowing which pods are scanned
        #[arg(long, default_value = "")]
        filter_labels: String,

        /// Severities passed through to the scan engine
        #[arg(long, default_value = "CRITICAL,HIGH,MEDIUM,LOW,UNKNOWN")]
        severity: String,

        /// Per-image scan timeout in seconds
        #[arg(long, default_value_t = 300)]
        scan_timeout_secs: u64,
    },
    /// Run a cluster compliance benchmark and print the report as JSON
    Cis {
        /// Benchmark name understood by the scan engine
        #[arg(long, default_value = "k8s-cis")]
        benchmark: String,

        /// Benchmark run timeout in seconds
        #[arg(long, default_value_t = 600)]
        scan_timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing("kubevet", &cli.log_level)?;

    match cli.command {
        Commands::Scan {
            workers,
            image_name_replacement,
            area_labels,
            teams_labels,
            filter_labels,
            severity,
            scan_timeout_secs,
        } => {
            let config = ScanConfig {
                log_level: cli.log_level,
                workers,
                image_name_replacement,
                area_labels,
                teams_labels,
                filter_labels,
                severity: severity.clone(),
                scan_image_timeout: Duration::from_secs(scan_timeout_secs),
            };

            let cluster = Arc::new(KubeClusterClient::new().await?);
            let engine = Arc::new(TrivyClient::new(severity, config.scan_image_timeout));
            let scanner = Scanner::new(config, cluster, Arc::new(DockerCli), engine);

            let report = scanner.scan().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            info!(images = report.image_count, "scan finished");
        }
        Commands::Cis {
            benchmark,
            scan_timeout_secs,
        } => {
            let config = ScanConfig {
                log_level: cli.log_level,
                scan_image_timeout: Duration::from_secs(scan_timeout_secs),
                ..Default::default()
            };

            let cluster = Arc::new(KubeClusterClient::new().await?);
            let engine = Arc::new(TrivyClient::new(
                config.severity.clone(),
                config.scan_image_timeout,
            ));
            let scanner = Scanner::new(config, cluster, Arc::new(DockerCli), engine);

            let report = scanner.cis_scan(&benchmark).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            info!(benchmark = %report.benchmark, "compliance benchmark finished");
        }
    }

    Ok(())
}
