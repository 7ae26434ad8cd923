use async_trait::async_trait;
use kubevet_common::diagnostic::{Diagnosable, Error};
use kubevet_common::Result;
use kubevet_domain::engine::ImageCache;
use tokio::process::Command;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("failed to run 'docker {command}': {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("'docker {command}' for image {image} exited with {status}: {stderr}")]
    CommandFailed {
        command: &'static str,
        image: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

impl Diagnosable for DockerError {
    fn code(&self) -> String {
        match self {
            Self::Spawn { .. } => "DOCKER_NOT_AVAILABLE".to_string(),
            Self::CommandFailed { .. } => "DOCKER_COMMAND_FAILED".to_string(),
        }
    }
    fn suggestion(&self) -> Option<String> {
        match self {
            Self::Spawn { .. } => {
                Some("Check that the docker CLI is installed and on PATH".to_string())
            }
            Self::CommandFailed { .. } => {
                Some("Check that the docker daemon is running and the image reference exists".to_string())
            }
        }
    }
}

/// Image cache backed by the local docker daemon, driven through the CLI.
#[derive(Debug, Default, Clone)]
pub struct DockerCli;

impl DockerCli {
    async fn run(&self, command: &'static str, image: &str) -> Result<()> {
        info!(command, image, "running docker command");
        let output = Command::new("docker")
            .arg(command)
            .arg(image)
            .output()
            .await
            .map_err(|e| Error::new(DockerError::Spawn { command, source: e }))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::new(DockerError::CommandFailed {
                command,
                image: image.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }))
        }
    }
}

#[async_trait]
impl ImageCache for DockerCli {
    async fn pull(&self, image: &str) -> Result<()> {
        self.run("pull", image).await
    }

    async fn remove(&self, image: &str) -> Result<()> {
        self.run("rmi", image).await
    }
}
