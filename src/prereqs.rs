//! Prerequisite checking and repair.
//!
//! Verifies the minimal environment before any mutating operation: the
//! cluster CLI on PATH (with a one-time interactive install fallback),
//! control-plane connectivity, and virtualization device permissions.
//!
//! The first two steps are hard gates; the device checks are advisory
//! (logged, never aborting). The whole check is idempotent and runs
//! before every top-level operation.

use crate::constants::KUBECTL_PIN;
use crate::error::{Error, Result};
use crate::exec::{which, CommandRunner};
use crate::kubectl::Kubectl;
use crate::platform::{Arch, Os, Platform};
use crate::ui::Confirm;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Virtualization device node checked on Linux and WSL hosts.
const KVM_DEVICE: &str = "/dev/kvm";

/// Resolves a tool name on the execution path. Swappable so headless
/// tests can simulate a present or absent CLI.
pub type ToolLookup = fn(&str) -> Option<PathBuf>;

/// Checks and, with user consent, repairs the environment.
pub struct PrereqChecker {
    runner: Arc<dyn CommandRunner>,
    kubectl: Kubectl,
    platform: Platform,
    confirm: Arc<dyn Confirm>,
    lookup: ToolLookup,
}

impl PrereqChecker {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        platform: Platform,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        Self::with_lookup(runner, platform, confirm, which)
    }

    /// Constructor with an explicit tool lookup.
    pub fn with_lookup(
        runner: Arc<dyn CommandRunner>,
        platform: Platform,
        confirm: Arc<dyn Confirm>,
        lookup: ToolLookup,
    ) -> Self {
        let kubectl = Kubectl::new(runner.clone());
        Self {
            runner,
            kubectl,
            platform,
            confirm,
            lookup,
        }
    }

    /// Runs all prerequisite steps. On `Err` the caller must not proceed
    /// to any mutating operation.
    pub async fn check(&self) -> Result<()> {
        self.ensure_kubectl().await?;

        self.kubectl.cluster_info().await.map_err(|e| {
            error!("cannot connect to Kubernetes cluster; is Rancher Desktop running?");
            e
        })?;
        info!("connected to Kubernetes cluster");

        info!(platform = %self.platform, "detected platform");

        match self.platform.os {
            Os::Linux => self.check_kvm_writable().await,
            Os::Wsl => self.check_kvm_readable(),
            _ => {}
        }

        Ok(())
    }

    // =========================================================================
    // Step 1: cluster CLI
    // =========================================================================

    async fn ensure_kubectl(&self) -> Result<()> {
        if (self.lookup)("kubectl").is_some() {
            info!("kubectl found");
            return Ok(());
        }

        warn!("kubectl not found in PATH");
        if self
            .confirm
            .confirm("Do you want to attempt to install kubectl automatically?")
        {
            if let Err(e) = self.install_kubectl().await {
                error!(error = %e, "kubectl installation failed");
            }
        }

        if (self.lookup)("kubectl").is_none() {
            return Err(Error::ToolMissing {
                tool: "kubectl".to_string(),
                hint: "install it manually and re-run".to_string(),
            });
        }
        info!("kubectl found");
        Ok(())
    }

    /// One-time download-and-install fallback: fetch the pinned release,
    /// set the execute bit, and move it into a system binary directory
    /// (the move prompts for sudo).
    async fn install_kubectl(&self) -> Result<()> {
        let Some(os) = self.platform.kubectl_os() else {
            warn!(platform = %self.platform, "auto-install not supported for this platform");
            return Ok(());
        };
        let arch = match self.platform.arch {
            Arch::Arm64 => "arm64",
            Arch::Amd64 | Arch::Other => "amd64",
        };
        let url = format!(
            "https://dl.k8s.io/release/{}/bin/{}/{}/kubectl",
            KUBECTL_PIN, os, arch
        );

        info!(%url, "downloading kubectl");
        self.run_checked("curl", &["-LO", url.as_str()]).await?;
        self.run_checked("chmod", &["+x", "kubectl"]).await?;

        info!("moving kubectl to /usr/local/bin/ (may ask for sudo password)");
        self.run_checked("sudo", &["mv", "kubectl", "/usr/local/bin/kubectl"])
            .await?;
        info!("kubectl installed");
        Ok(())
    }

    async fn run_checked(&self, program: &str, args: &[&str]) -> Result<()> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let output = self.runner.run(program, &args, None).await?;
        if !output.is_success() {
            return Err(crate::exec::command_error(program, &args, &output));
        }
        Ok(())
    }

    // =========================================================================
    // Steps 3-4: virtualization device (advisory)
    // =========================================================================

    /// On bare Linux the current user must be able to write the KVM
    /// device node. The group fix needs a new login session to take
    /// effect, so it is advisory: warn and continue without re-checking.
    async fn check_kvm_writable(&self) {
        if device_accessible(KVM_DEVICE, AccessMode::Write) {
            return;
        }
        warn!("{} is not writable by current user", KVM_DEVICE);

        let user = std::env::var("USER").unwrap_or_default();
        let question = format!("Add user '{}' to 'kvm' group? (Requires sudo)", user);
        if !self.confirm.confirm(&question) {
            warn!("skipping KVM permission fix; CoCo may fail");
            return;
        }

        match self
            .run_checked("sudo", &["usermod", "-aG", "kvm", user.as_str()])
            .await
        {
            Ok(()) => {
                info!("user added to kvm group; log out and back in for this to take effect");
            }
            Err(e) => error!(error = %e, "failed to add user to kvm group"),
        }
    }

    /// On WSL the device node existing at all is the signal; absence
    /// points at a host-level nested-virtualization setting.
    fn check_kvm_readable(&self) {
        if device_accessible(KVM_DEVICE, AccessMode::Read) {
            info!("KVM device node found ({})", KVM_DEVICE);
        } else {
            warn!(
                "{} not readable; ensure 'nestedVirtualization=true' is set in .wslconfig",
                KVM_DEVICE
            );
        }
    }
}

enum AccessMode {
    Read,
    Write,
}

#[cfg(unix)]
fn device_accessible(path: &str, mode: AccessMode) -> bool {
    use std::ffi::CString;
    let Ok(c_path) = CString::new(path) else {
        return false;
    };
    let flag = match mode {
        AccessMode::Read => libc::R_OK,
        AccessMode::Write => libc::W_OK,
    };
    // SAFETY: access() only reads the path string; c_path outlives the call.
    unsafe { libc::access(c_path.as_ptr(), flag) == 0 }
}

#[cfg(not(unix))]
fn device_accessible(_path: &str, _mode: AccessMode) -> bool {
    false
}
