//! Cluster resource manifests.
//!
//! Serde models for the declarative resources this tool submits: the
//! `CcRuntime` custom resource the operator reconciles, and the disposable
//! probe pod used by validation. Field names are operator-facing wire
//! format and must round-trip exactly (`pulltype` really is lowercase).
//!
//! Everything here is constructed in memory, serialized once with
//! `serde_yaml`, and owned thereafter by the cluster's reconciler.

use crate::constants::{
    CC_OPT_DIR, CC_RUNTIME_NAME, CONTAINERD_CONFIG, ENCLAVE_CC_ETC_DIR, OPERATOR_NAMESPACE,
    PROBE_POD_IMAGE, RC_KATA, RC_KATA_CLH, RC_KATA_QEMU,
};
use crate::error::Result;
use crate::script::{cleanup_cmd, uninstall_cmd, InstallScript};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// CcRuntime Resource
// =============================================================================

/// The CcRuntime custom resource submitted once per `setup` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CcRuntime {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: CcRuntimeSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CcRuntimeSpec {
    /// Runtime family the operator installs.
    pub runtime_name: String,
    /// Node selector kept deliberately loose (`kubernetes.io/os: linux`)
    /// to bypass TEE-hardware trait checks that an emulated host fails.
    pub cc_node_selector: NodeSelector,
    pub config: CcInstallConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelector {
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CcInstallConfig {
    pub install_type: String,
    pub payload_image: String,
    pub image_pull_policy: String,
    pub install_cmd: Vec<String>,
    pub uninstall_cmd: Vec<String>,
    pub cleanup_cmd: Vec<String>,
    pub installer_volumes: Vec<Volume>,
    pub installer_volume_mounts: Vec<VolumeMount>,
    pub environment_variables: Vec<EnvVar>,
    pub runtime_classes: Vec<RuntimeClassEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub host_path: HostPath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPath {
    pub path: String,
    #[serde(rename = "type")]
    pub path_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// One runtime class the operator registers. `pulltype` is a single
/// lowercase word in the operator's schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeClassEntry {
    pub name: String,
    pub snapshotter: String,
    pub pulltype: String,
}

impl RuntimeClassEntry {
    fn overlayfs(name: &str) -> Self {
        Self {
            name: name.to_string(),
            snapshotter: "overlayfs".to_string(),
            pulltype: "auth".to_string(),
        }
    }
}

impl CcRuntime {
    /// Builds the CcRuntime resource for the enclave-cc simulation payload
    /// with the host-bridging install script.
    ///
    /// The installer volumes mount the host paths the script writes to;
    /// without them a bundle-type install with an overridden command has
    /// nowhere persistent to land. The two env vars are consumed by the
    /// payload's entry script, which crashes when they are unset — an
    /// empty JSON object, base64 encoded, satisfies it.
    pub fn coco_default(payload_image: &str, script: &InstallScript) -> Self {
        let mut match_labels = BTreeMap::new();
        match_labels.insert("kubernetes.io/os".to_string(), "linux".to_string());

        let volumes = vec![
            ("host-opt-cc", CC_OPT_DIR),
            ("host-etc-enclave-cc", ENCLAVE_CC_ETC_DIR),
            ("host-etc-containerd", parent_dir(CONTAINERD_CONFIG)),
        ];

        Self {
            api_version: "confidentialcontainers.org/v1beta1".to_string(),
            kind: "CcRuntime".to_string(),
            metadata: Metadata {
                name: CC_RUNTIME_NAME.to_string(),
                namespace: Some(OPERATOR_NAMESPACE.to_string()),
                labels: BTreeMap::new(),
            },
            spec: CcRuntimeSpec {
                runtime_name: RC_KATA.to_string(),
                cc_node_selector: NodeSelector { match_labels },
                config: CcInstallConfig {
                    install_type: "bundle".to_string(),
                    payload_image: payload_image.to_string(),
                    image_pull_policy: "IfNotPresent".to_string(),
                    install_cmd: script.as_install_cmd(),
                    uninstall_cmd: uninstall_cmd(),
                    cleanup_cmd: cleanup_cmd(),
                    installer_volumes: volumes
                        .iter()
                        .map(|(name, path)| Volume {
                            name: name.to_string(),
                            host_path: HostPath {
                                path: path.to_string(),
                                path_type: "DirectoryOrCreate".to_string(),
                            },
                        })
                        .collect(),
                    installer_volume_mounts: volumes
                        .iter()
                        .map(|(name, path)| VolumeMount {
                            name: name.to_string(),
                            mount_path: path.to_string(),
                        })
                        .collect(),
                    environment_variables: vec![
                        EnvVar {
                            name: "DECRYPT_CONFIG".to_string(),
                            value: "e30=".to_string(),
                        },
                        EnvVar {
                            name: "OCICRYPT_CONFIG".to_string(),
                            value: "e30=".to_string(),
                        },
                    ],
                    runtime_classes: vec![
                        RuntimeClassEntry::overlayfs(RC_KATA),
                        RuntimeClassEntry::overlayfs(RC_KATA_QEMU),
                        RuntimeClassEntry::overlayfs(RC_KATA_CLH),
                    ],
                },
            },
        }
    }

    /// Serializes to the manifest text submitted via `kubectl apply -f -`.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn parent_dir(path: &str) -> &str {
    Path::new(path)
        .parent()
        .and_then(|p| p.to_str())
        .unwrap_or(path)
}

// =============================================================================
// Probe Pod
// =============================================================================

/// Minimal single-container pod pinned to a runtime class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbePod {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: ProbePodSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbePodSpec {
    pub restart_policy: String,
    pub runtime_class_name: String,
    pub containers: Vec<ProbeContainer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeContainer {
    pub name: String,
    pub image: String,
}

impl ProbePod {
    /// Builds the disposable validation pod. `label` is a `key=value`
    /// pair matching the selector validation polls on.
    pub fn new(name: &str, label: &str, runtime_class: &str) -> Self {
        let mut labels = BTreeMap::new();
        if let Some((k, v)) = label.split_once('=') {
            labels.insert(k.to_string(), v.to_string());
        }

        Self {
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
            metadata: Metadata {
                name: name.to_string(),
                namespace: None,
                labels,
            },
            spec: ProbePodSpec {
                restart_policy: "Never".to_string(),
                runtime_class_name: runtime_class.to_string(),
                containers: vec![ProbeContainer {
                    name: "nginx".to_string(),
                    image: PROBE_POD_IMAGE.to_string(),
                }],
            },
        }
    }

    /// Serializes to the manifest text submitted via `kubectl apply -f -`.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
