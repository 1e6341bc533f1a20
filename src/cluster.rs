//! Idempotent cluster mutation.
//!
//! Every mutation here has apply semantics: create-or-update, never a
//! failure on already-exists, so `setup` can be re-run safely against the
//! same cluster. The mutator never waits for a mutation's effects; the
//! readiness poller owns convergence.

use crate::constants::{operator_kustomize_url, NODE_LABEL_CC_ENABLED, NODE_LABEL_WORKER};
use crate::error::{Error, Result};
use crate::kubectl::Kubectl;
use crate::manifest::CcRuntime;
use tracing::{info, warn};

/// Applies declarative changes to the cluster.
pub struct ClusterMutator {
    kubectl: Kubectl,
}

impl ClusterMutator {
    pub fn new(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }

    /// Labels every node for CoCo scheduling eligibility. Best effort:
    /// failure warns and the setup continues, since the nodes may already
    /// carry the labels or the user may lack label permissions.
    pub async fn label_nodes(&self) {
        info!("labeling nodes for CoCo eligibility");
        for label in [NODE_LABEL_WORKER, NODE_LABEL_CC_ENABLED] {
            if let Err(e) = self.kubectl.label_all_nodes(label).await {
                warn!(label, error = %e, "failed to label nodes; continuing");
                return;
            }
        }
    }

    /// Applies the operator's versioned kustomize bundle. Fatal on
    /// failure: nothing downstream can work without the operator.
    pub async fn apply_operator(&self, version: &str) -> Result<()> {
        let url = operator_kustomize_url(version);
        info!(%url, "applying operator manifests");
        self.kubectl
            .apply_kustomize(&url)
            .await
            .map_err(|e| Error::ManifestApply {
                what: format!("operator {}", version),
                reason: e.to_string(),
            })
    }

    /// Serializes and submits the CcRuntime resource. Fatal on failure,
    /// but the operator install already applied is not rolled back; the
    /// cluster remains the source of truth for the next run.
    pub async fn apply_cc_runtime(&self, runtime: &CcRuntime) -> Result<()> {
        info!(name = %runtime.metadata.name, "applying CcRuntime configuration");
        let yaml = runtime.to_yaml()?;
        self.kubectl
            .apply_stdin(&yaml)
            .await
            .map_err(|e| Error::ManifestApply {
                what: "CcRuntime".to_string(),
                reason: e.to_string(),
            })?;
        info!("CcRuntime applied; the operator will now install the runtime classes");
        Ok(())
    }
}
