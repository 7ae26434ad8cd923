use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One running container observed in the cluster. Many containers may
/// reference the same image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub container_name: String,
    pub pod_name: String,
    pub namespace: String,
    /// The image reference the container was started from.
    pub image: String,
    /// Pod labels merged over namespace labels, used for ownership
    /// attribution in the report.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Enumerates the containers running in the cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Lists the containers of all pods across namespaces, optionally
    /// narrowed by a label selector. An error here aborts the whole run.
    async fn containers_in_namespaces(
        &self,
        label_selector: &str,
    ) -> Result<Vec<ContainerSummary>>;
}
