//! Install-script templating.
//!
//! The operator's install container assumes a systemd host with the
//! default artifact layout. The Rancher Desktop VM is Alpine/OpenRC with
//! the payload's artifacts under a different root, so the install command
//! embedded in the CcRuntime resource is generated here instead:
//! service-manager calls are translated to OpenRC, and every step that
//! reaches outside the install container's own mount namespace enters the
//! host namespace explicitly (`nsenter --target 1 --mount`), which is what
//! lets one manifest work against a non-systemd host.
//!
//! The script is a structured sequence of typed [`Step`]s rendered to
//! shell syntax only at the boundary, so ordering and the idempotence
//! guard are testable independently of text formatting. Step order is
//! load-bearing: binaries are staged before configuration, configuration
//! before the containerd restart that picks it up.

use crate::constants::{
    AGENT_INSTANCE_DIR, ARTIFACTS_DIR, BOOT_INSTANCE_DIR, CC_OPT_DIR, CONTAINERD_CONFIG,
    ENCLAVE_CC_ETC_DIR, SHIM_BINARY,
};

// =============================================================================
// Typed Steps
// =============================================================================

/// One shell directive in the install sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Progress marker echoed into the install container's log.
    Echo(String),
    /// `mkdir -p` inside the install container (host-mounted path).
    MakeDir(String),
    /// Plain copy inside the install container.
    Copy { src: String, dst: String },
    /// Clobbering copy (`cp -f`) inside the install container.
    CopyForce { src: String, dst: String },
    /// Set the execute bit; build artifacts arrive without it.
    ChmodExec(String),
    /// Symlink created in the host mount namespace, so the binary is
    /// resolvable by the host's containerd rather than only inside the
    /// install container.
    HostSymlink { target: String, link: String },
    /// chmod executed in the host mount namespace.
    HostChmod { mode: String, path: String },
    /// Append `block` to `file` in the host namespace unless `guard`
    /// already occurs in the file; repeated installs must not duplicate
    /// the block.
    AppendBlockOnce {
        guard: String,
        file: String,
        block: String,
    },
    /// Restart a host service with the host's actual service manager
    /// (OpenRC `rc-service`, not the operator's assumed `systemctl`).
    HostServiceRestart { service: String },
    /// Block forever; the operator expects the install container to stay
    /// alive as a sidecar-style probe.
    SleepForever,
}

/// Prefix entering the host's initial mount namespace.
const HOST_NS: &str = "nsenter --target 1 --mount --";

impl Step {
    /// Renders this step to its shell form.
    pub fn render(&self) -> String {
        match self {
            Step::Echo(msg) => format!("echo '{}'", msg),
            Step::MakeDir(path) => format!("mkdir -p {}", path),
            Step::Copy { src, dst } => format!("cp {} {}", src, dst),
            Step::CopyForce { src, dst } => format!("cp -f {} {}", src, dst),
            Step::ChmodExec(path) => format!("chmod +x {}", path),
            Step::HostSymlink { target, link } => {
                format!("{} ln -sf {} {}", HOST_NS, target, link)
            }
            Step::HostChmod { mode, path } => format!("{} chmod {} {}", HOST_NS, mode, path),
            Step::AppendBlockOnce { guard, file, block } => format!(
                "{} sh -c 'grep -q \"{}\" {} || cat <<EOF >> {}\n{}\nEOF'",
                HOST_NS, guard, file, file, block
            ),
            Step::HostServiceRestart { service } => {
                format!("{} rc-service {} restart", HOST_NS, service)
            }
            Step::SleepForever => "sleep infinity".to_string(),
        }
    }

    /// Simulates the append-once semantics against file content: returns
    /// the content unchanged when the guard is already present.
    pub fn simulate_append(&self, existing: &str) -> String {
        match self {
            Step::AppendBlockOnce { guard, block, .. } => {
                if existing.contains(guard.as_str()) {
                    existing.to_string()
                } else {
                    format!("{}{}\n", existing, block)
                }
            }
            _ => existing.to_string(),
        }
    }
}

// =============================================================================
// Install Script
// =============================================================================

/// Ordered install command sequence for the CcRuntime resource.
///
/// Regenerated on every run from path constants; holds no external state,
/// so two invocations with no environment change render byte-identically.
#[derive(Debug, Clone)]
pub struct InstallScript {
    steps: Vec<Step>,
}

impl InstallScript {
    /// The standard CoCo install sequence for the enclave-cc simulation
    /// payload.
    pub fn coco_default() -> Self {
        let agent_src = format!("{}/agent/enclave-agent", ARTIFACTS_DIR);
        let shim_host = format!("{}/bin/{}", CC_OPT_DIR, SHIM_BINARY);
        let shim_usr_bin = format!("/usr/bin/{}", SHIM_BINARY);

        let mut steps = vec![Step::Echo("Installing CoCo artifacts...".to_string())];

        // Agent binary into both instance bundles, execute bit set
        // explicitly.
        for instance in [AGENT_INSTANCE_DIR, BOOT_INSTANCE_DIR] {
            let bin_dir = format!("{}/rootfs/bin", instance);
            let agent_dst = format!("{}/enclave-agent", bin_dir);
            steps.push(Step::MakeDir(bin_dir));
            steps.push(Step::Copy {
                src: agent_src.clone(),
                dst: agent_dst.clone(),
            });
            steps.push(Step::ChmodExec(agent_dst));
        }

        // Agent instance OCI config and the shim's own configuration.
        steps.push(Step::Copy {
            src: format!("{}/config.json", ARTIFACTS_DIR),
            dst: format!("{}/", AGENT_INSTANCE_DIR),
        });
        steps.push(Step::MakeDir(ENCLAVE_CC_ETC_DIR.to_string()));
        steps.push(Step::Copy {
            src: format!("{}/shim-rune-config.toml", ARTIFACTS_DIR),
            dst: format!("{}/config.toml", ENCLAVE_CC_ETC_DIR),
        });

        // Shim binary: staged on the host-mounted path, then linked into
        // /usr/bin in the host namespace where containerd resolves it.
        steps.push(Step::MakeDir(format!("{}/bin", CC_OPT_DIR)));
        steps.push(Step::CopyForce {
            src: format!("{}/shim/{}", ARTIFACTS_DIR, SHIM_BINARY),
            dst: shim_host.clone(),
        });
        steps.push(Step::HostSymlink {
            target: shim_host,
            link: shim_usr_bin.clone(),
        });
        steps.push(Step::HostChmod {
            mode: "755".to_string(),
            path: shim_usr_bin,
        });

        // Runtime registration, then the restart that makes it take
        // effect. The restart depends on the block already being present.
        steps.push(Step::Echo("Configuring containerd...".to_string()));
        steps.push(Step::AppendBlockOnce {
            guard: "enclave-cc".to_string(),
            file: CONTAINERD_CONFIG.to_string(),
            block: containerd_runtime_block(),
        });
        steps.push(Step::Echo("Restarting containerd...".to_string()));
        steps.push(Step::HostServiceRestart {
            service: "containerd".to_string(),
        });

        steps.push(Step::Echo("Installation complete. Sleeping...".to_string()));
        steps.push(Step::SleepForever);

        Self { steps }
    }

    /// The ordered step list.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Renders the whole sequence as one short-circuiting shell command.
    pub fn render(&self) -> String {
        self.steps
            .iter()
            .map(Step::render)
            .collect::<Vec<_>>()
            .join(" && ")
    }

    /// The install command array embedded in the CcRuntime resource.
    pub fn as_install_cmd(&self) -> Vec<String> {
        vec!["/bin/sh".to_string(), "-c".to_string(), self.render()]
    }
}

/// containerd runtime registration appended to the host's config.
fn containerd_runtime_block() -> String {
    [
        r#"[plugins."io.containerd.grpc.v1.cri".containerd.runtimes.enclave-cc]"#,
        r#"  runtime_type = "io.containerd.rune.v2""#,
        r#"  cri_handler = "cc""#,
    ]
    .join("\n")
}

/// Uninstall command array: delegated to the payload's own deploy script.
pub fn uninstall_cmd() -> Vec<String> {
    vec![
        format!("{}/scripts/enclave-cc-deploy.sh", ARTIFACTS_DIR),
        "uninstall".to_string(),
    ]
}

/// Cleanup command array: delegated to the payload's own deploy script.
pub fn cleanup_cmd() -> Vec<String> {
    vec![
        format!("{}/scripts/enclave-cc-deploy.sh", ARTIFACTS_DIR),
        "cleanup".to_string(),
    ]
}
