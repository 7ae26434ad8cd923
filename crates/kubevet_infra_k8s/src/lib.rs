use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{Api, ListParams};
use kube::Client;
use kubevet_common::diagnostic::{Diagnosable, Error};
use kubevet_common::Result;
use kubevet_domain::cluster::{ClusterClient, ContainerSummary};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum K8sError {
    #[error("failed to build Kubernetes client: {0}")]
    ClientSetup(#[source] kube::Error),
    #[error("Kubernetes API request failed: {0}")]
    Api(#[from] kube::Error),
}

impl Diagnosable for K8sError {
    fn code(&self) -> String {
        match self {
            Self::ClientSetup(_) => "K8S_CLIENT_SETUP_FAILED".to_string(),
            Self::Api(_) => "K8S_API_ERROR".to_string(),
        }
    }
    fn suggestion(&self) -> Option<String> {
        match self {
            Self::ClientSetup(_) => {
                Some("Check that a kubeconfig or in-cluster service account is available".to_string())
            }
            Self::Api(_) => {
                Some("Check cluster connectivity and RBAC permissions for listing pods".to_string())
            }
        }
    }
}

/// Cluster view backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Connects using the ambient kubeconfig or in-cluster configuration.
    pub async fn new() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| Error::new(K8sError::ClientSetup(e)))?;
        Ok(Self { client })
    }

    async fn namespace_labels(&self) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::new(K8sError::Api(e)))?;

        let mut labels = BTreeMap::new();
        for namespace in &list.items {
            if let Some(name) = &namespace.metadata.name {
                labels.insert(
                    name.clone(),
                    namespace.metadata.labels.clone().unwrap_or_default(),
                );
            }
        }
        Ok(labels)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn containers_in_namespaces(
        &self,
        label_selector: &str,
    ) -> Result<Vec<ContainerSummary>> {
        let namespace_labels = self.namespace_labels().await?;

        let params = if label_selector.is_empty() {
            ListParams::default()
        } else {
            ListParams::default().labels(label_selector)
        };
        let pods: Api<Pod> = Api::all(self.client.clone());
        let pod_list = pods
            .list(&params)
            .await
            .map_err(|e| Error::new(K8sError::Api(e)))?;

        let mut containers = Vec::new();
        for pod in &pod_list.items {
            let namespace = pod.metadata.namespace.clone().unwrap_or_default();
            let pod_name = pod.metadata.name.clone().unwrap_or_default();

            // Pod labels win over namespace labels on key collisions.
            let mut labels = namespace_labels.get(&namespace).cloned().unwrap_or_default();
            if let Some(pod_labels) = &pod.metadata.labels {
                labels.extend(pod_labels.clone());
            }

            let Some(spec) = &pod.spec else { continue };
            for container in &spec.containers {
                let Some(image) = &container.image else { continue };
                containers.push(ContainerSummary {
                    container_name: container.name.clone(),
                    pod_name: pod_name.clone(),
                    namespace: namespace.clone(),
                    image: image.clone(),
                    labels: labels.clone(),
                });
            }
        }

        info!(
            containers = containers.len(),
            label_selector, "listed running containers"
        );
        Ok(containers)
    }
}
