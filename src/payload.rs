//! Payload image build.
//!
//! Assembles a scratch build context with the generated configuration
//! artifacts and drives the external multi-stage image build. The three
//! artifacts are written verbatim from built-in templates; nothing in them
//! is user-configurable beyond directory placement. The build itself runs
//! through `nerdctl` in the `k8s.io` namespace so the resulting image is
//! visible to the cluster's containerd without a push.

use crate::config::Config;
use crate::constants::{
    payload_image, BUILD_CTX_DIR, CFG_PAYLOAD_VERSION, DEFAULT_PAYLOAD_VERSION, PAYLOAD_DIR,
};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::platform::Platform;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Builds the CoCo payload image from the infrastructure directory.
pub struct PayloadBuilder {
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
    infra_dir: PathBuf,
}

impl PayloadBuilder {
    pub fn new(runner: Arc<dyn CommandRunner>, platform: Platform, infra_dir: &Path) -> Self {
        Self {
            runner,
            platform,
            infra_dir: infra_dir.to_path_buf(),
        }
    }

    /// Runs the full build: context preparation, artifact generation, and
    /// the external image build. A non-zero build exit is fatal; the
    /// scratch context is left behind for post-mortem inspection.
    pub async fn build(&self, config: &Config) -> Result<String> {
        let target_arch = self.platform.build_arch();
        info!(platform = %self.platform, target_arch, "building payload");

        let payload_dir = self.infra_dir.join(PAYLOAD_DIR);
        if !payload_dir.exists() {
            return Err(Error::PayloadDirMissing(payload_dir.display().to_string()));
        }

        let build_ctx = self.prepare_build_context()?;

        let version = config.get_or(CFG_PAYLOAD_VERSION, DEFAULT_PAYLOAD_VERSION);
        let image = payload_image(version);
        let dockerfile = payload_dir.join("Dockerfile");

        info!(version, %image, "starting multi-stage image build");
        let args: Vec<String> = vec![
            "--namespace".to_string(),
            "k8s.io".to_string(),
            "build".to_string(),
            "--build-arg".to_string(),
            format!("TARGETARCH={}", target_arch),
            "--build-arg".to_string(),
            format!("COCO_VERSION={}", version),
            "-f".to_string(),
            dockerfile.display().to_string(),
            "-t".to_string(),
            image.clone(),
            build_ctx.display().to_string(),
        ];

        let code = self.runner.run_streaming("nerdctl", &args).await?;
        if code != 0 {
            return Err(Error::BuildFailed(format!(
                "nerdctl build exited {}",
                code
            )));
        }

        info!(%image, "build successful; image is local to the k8s.io namespace, no push needed");
        info!("verify with: nerdctl -n k8s.io images | grep coco");
        Ok(image)
    }

    /// Recreates the scratch build-context tree and emits the generated
    /// artifacts into it.
    fn prepare_build_context(&self) -> Result<PathBuf> {
        let build_ctx = self.infra_dir.join(BUILD_CTX_DIR);
        let artifacts = build_ctx.join("artifacts");

        if build_ctx.exists() {
            std::fs::remove_dir_all(&build_ctx).map_err(|e| Error::BuildContextFailed {
                path: build_ctx.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        std::fs::create_dir_all(&artifacts).map_err(|e| Error::BuildContextFailed {
            path: artifacts.display().to_string(),
            reason: e.to_string(),
        })?;

        info!(path = %artifacts.display(), "generating configuration artifacts");
        std::fs::write(artifacts.join("enclave-cc.yaml"), RUNTIME_CLASS_YAML)?;
        std::fs::write(artifacts.join("config.json"), AGENT_OCI_CONFIG_JSON)?;
        std::fs::write(artifacts.join("shim-rune-config.toml"), SHIM_CONFIG_TOML)?;

        Ok(build_ctx)
    }
}

// =============================================================================
// Artifact Templates
// =============================================================================

/// RuntimeClass declaration registered by the payload.
const RUNTIME_CLASS_YAML: &str = r#"apiVersion: node.k8s.io/v1
kind: RuntimeClass
metadata:
  name: enclave-cc
handler: enclave-cc
scheduling:
  nodeSelector:
    confidentialcontainers.org/enabled: "true"
"#;

/// Fixed OCI process/mount specification for the agent instance bundle.
/// The containerd bind mounts point at the k3s paths Rancher Desktop uses.
const AGENT_OCI_CONFIG_JSON: &str = r#"{
  "ociVersion": "1.0.2-dev",
  "process": {
    "terminal": false,
    "user": { "uid": 0, "gid": 0 },
    "args": [ "/bin/enclave-agent" ],
    "env": [ "PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin", "ENCLAVE_AGENT=true", "TERM=xterm", "SHIMS=rune io.containerd.rune.v2 enclave-cc", "SNAPSHOTTER_HANDLER_MAPPING=rune:overlayfs,io.containerd.rune.v2:overlayfs,enclave-cc:overlayfs", "PULL_TYPE_MAPPING=rune:auth,io.containerd.rune.v2:auth,enclave-cc:auth" ],
    "cwd": "/",
    "capabilities": { "bounding": ["CAP_AUDIT_WRITE", "CAP_KILL", "CAP_NET_BIND_SERVICE"], "effective": ["CAP_AUDIT_WRITE", "CAP_KILL", "CAP_NET_BIND_SERVICE"], "inheritable": ["CAP_AUDIT_WRITE", "CAP_KILL", "CAP_NET_BIND_SERVICE"], "permitted": ["CAP_AUDIT_WRITE", "CAP_KILL", "CAP_NET_BIND_SERVICE"], "ambient": ["CAP_AUDIT_WRITE", "CAP_KILL", "CAP_NET_BIND_SERVICE"] },
    "rlimits": [{ "type": "RLIMIT_NOFILE", "hard": 65535, "soft": 65535 }],
    "noNewPrivileges": true
  },
  "root": { "path": "rootfs" },
  "hostname": "rune",
  "mounts": [
    { "destination": "/proc", "type": "proc", "source": "proc" },
    { "destination": "/dev", "type": "tmpfs", "source": "tmpfs", "options": ["nosuid", "strictatime", "mode=755", "size=65536k"] },
    { "destination": "/dev/pts", "type": "devpts", "source": "devpts", "options": ["nosuid", "noexec", "newinstance", "ptmxmode=0666", "mode=0620", "gid=5"] },
    { "destination": "/dev/shm", "type": "tmpfs", "source": "shm", "options": ["nosuid", "noexec", "nodev", "mode=1777", "size=65536k"] },
    { "destination": "/dev/mqueue", "type": "mqueue", "source": "mqueue", "options": ["nosuid", "noexec", "nodev"] },
    { "destination": "/sys", "type": "sysfs", "source": "sysfs", "options": ["nosuid", "noexec", "nodev", "ro"] },
    { "destination": "/run/containerd", "type": "bind", "source": "/run/k3s/containerd", "options": ["rbind", "rprivate"] },
    { "destination": "/var/lib/containerd", "type": "bind", "source": "/var/lib/rancher/k3s/agent/containerd", "options": ["rbind", "rprivate"] },
    { "destination": "/opt/confidential-containers", "type": "bind", "source": "/opt/confidential-containers", "options": ["rbind", "rprivate"] }
  ],
  "linux": { "resources": { "devices": [{ "allow": false, "access": "rwm" }] }, "namespaces": [ { "type": "pid" }, { "type": "ipc" }, { "type": "uts" }, { "type": "mount" } ] }
}"#;

/// Shim configuration staged to /etc/enclave-cc/config.toml by the
/// install script.
const SHIM_CONFIG_TOML: &str = r#"[log]
level = "debug"

[shim]
agent_sock = "/run/rune/enclave-agent.sock"

[containerd]
agent_container_instance = "/opt/confidential-containers/share/enclave-cc-agent-instance"
agent_container_root_dir = "/run/containerd/agent-enclave"
boot_container_instance = "/opt/confidential-containers/share/enclave-cc-boot-instance"
"#;
