//! # Deployment Constants
//!
//! Defines all version pins, cluster identifiers, host paths, and polling
//! budgets for the CoCo deployment layer. These constants are the **single
//! source of truth** for values that must agree between `build`, `setup`,
//! and `validate`.
//!
//! ## Modification Guidelines
//!
//! Before bumping a version pin:
//! 1. Check the operator release actually publishes index images for ARM64
//! 2. Re-verify the payload's artifact layout (`/opt/enclave-cc-artifacts`)
//!    still matches the install script in [`crate::script`]
//!
//! ## Cross-References
//!
//! - [`crate::script`]: Uses the host paths for the install command
//! - [`crate::payload`]: Uses the image repo and build-context names
//! - [`crate::poll`]: Uses the interval/timeout budgets

use std::time::Duration;

// =============================================================================
// Version Pins
// =============================================================================

/// Default Confidential Containers operator release.
///
/// Pinned because newer releases or unstable branches may have breaking
/// changes or missing index images for ARM64. Overridable via
/// `coco_operator_version` in the config file.
pub const DEFAULT_OPERATOR_VERSION: &str = "v0.12.0";

/// Default payload (enclave-cc artifacts) release. Overridable via
/// `coco_payload_version` in the config file.
pub const DEFAULT_PAYLOAD_VERSION: &str = "v0.11.0";

/// kubectl release fetched by the one-time installer fallback.
pub const KUBECTL_PIN: &str = "v1.29.0";

// =============================================================================
// Configuration Keys
// =============================================================================

/// Config key overriding the operator release.
pub const CFG_OPERATOR_VERSION: &str = "coco_operator_version";

/// Config key overriding the payload release.
pub const CFG_PAYLOAD_VERSION: &str = "coco_payload_version";

/// File name read by the configuration loader.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

// =============================================================================
// Cluster Identifiers
// =============================================================================

/// Kustomize bundle applied to install the operator, parameterized by release.
pub fn operator_kustomize_url(version: &str) -> String {
    format!(
        "github.com/confidential-containers/operator/config/release?ref={}",
        version
    )
}

/// CRD whose `established` condition signals the operator is serving.
pub const CC_RUNTIME_CRD: &str = "ccruntimes.confidentialcontainers.org";

/// Namespace the operator reconciles in.
pub const OPERATOR_NAMESPACE: &str = "confidential-containers-system";

/// Name of the CcRuntime resource submitted by `setup`.
pub const CC_RUNTIME_NAME: &str = "cc-runtime";

/// Node label allowing CoCo workloads to schedule.
pub const NODE_LABEL_CC_ENABLED: &str = "confidentialcontainers.org/enabled=true";

/// Worker role label applied alongside the CoCo label.
pub const NODE_LABEL_WORKER: &str = "node-role.kubernetes.io/worker=";

// =============================================================================
// Runtime Classes
// =============================================================================

/// Runtime class registered by the simulation payload. Its presence is the
/// strongest signal that the CoCo install actually completed.
pub const RC_ENCLAVE_CC: &str = "enclave-cc";

/// QEMU-backed kata variant, preferred on non-x86 hosts.
pub const RC_KATA_QEMU: &str = "kata-qemu";

/// Cloud-hypervisor-backed kata variant.
pub const RC_KATA_CLH: &str = "kata-clh";

/// Generic kata fallback.
pub const RC_KATA: &str = "kata";

// =============================================================================
// Payload Image
// =============================================================================

/// Repository for the locally built payload image, in the namespace the
/// cluster's containerd pulls from.
pub const PAYLOAD_IMAGE_REPO: &str = "k8s.io/coco-payload";

/// Image reference for a given payload version. The tag embeds the resolved
/// version so a rebuilt payload is never shadowed by a stale local tag.
pub fn payload_image(version: &str) -> String {
    format!("{}:{}", PAYLOAD_IMAGE_REPO, version)
}

/// Build-context directory recreated on every `build`, relative to the
/// infrastructure directory. Left behind after a failed build on purpose.
pub const BUILD_CTX_DIR: &str = "payload-build-ctx";

/// Directory containing the payload Dockerfile, relative to the
/// infrastructure directory.
pub const PAYLOAD_DIR: &str = "containers/coco-payload";

// =============================================================================
// Host Paths (install script)
// =============================================================================
//
// The payload image stages its artifacts under /opt/enclave-cc-artifacts;
// the install script copies them into host-mounted paths so they survive
// the install container. Ordering of use is load-bearing: binaries are
// staged before config, config before the containerd restart.
// =============================================================================

/// Artifact root inside the payload install container.
pub const ARTIFACTS_DIR: &str = "/opt/enclave-cc-artifacts";

/// Host-persisted root for CoCo binaries and instance bundles.
pub const CC_OPT_DIR: &str = "/opt/confidential-containers";

/// Agent instance bundle directory (host-mounted).
pub const AGENT_INSTANCE_DIR: &str = "/opt/confidential-containers/share/enclave-cc-agent-instance";

/// Boot instance bundle directory (host-mounted).
pub const BOOT_INSTANCE_DIR: &str = "/opt/confidential-containers/share/enclave-cc-boot-instance";

/// Shim configuration directory on the host.
pub const ENCLAVE_CC_ETC_DIR: &str = "/etc/enclave-cc";

/// containerd config file that receives the runtime registration block.
pub const CONTAINERD_CONFIG: &str = "/etc/containerd/config.toml";

/// Shim binary name registered with containerd.
pub const SHIM_BINARY: &str = "containerd-shim-rune-v2";

// =============================================================================
// Probe Pod
// =============================================================================

/// Name of the disposable validation pod.
pub const PROBE_POD_NAME: &str = "test-coco-start";

/// Label applied to the probe pod, used for phase polling.
pub const PROBE_POD_LABEL: &str = "app=test-coco";

/// Image run by the probe pod.
pub const PROBE_POD_IMAGE: &str = "nginx:alpine";

/// Namespace the probe pod is deployed into.
pub const PROBE_POD_NAMESPACE: &str = "default";

// =============================================================================
// Polling Budgets
// =============================================================================

/// Fixed spacing between cluster readiness probes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Budget for the CcRuntime CRD to report `established`.
pub const CRD_TIMEOUT: Duration = Duration::from_secs(60);

/// Budget for the probe pod to reach the Running phase. Generous because
/// the first run pulls the pod image through the CoCo runtime.
pub const POD_TIMEOUT: Duration = Duration::from_secs(300);

/// Attempts waiting for a runtime class to appear (24 x 5s, about two
/// minutes; the operator registers classes asynchronously after `setup`).
pub const RUNTIME_CLASS_ATTEMPTS: u32 = 24;
