//! Platform detection.
//!
//! Detects the host OS family and CPU architecture at runtime to determine
//! which install-script paths, download URLs, and build architectures apply.
//!
//! A Linux kernel running under the Windows Subsystem for Linux is reported
//! as [`Os::Wsl`], not [`Os::Linux`]: the virtualization device node and
//! nested-virtualization settings differ between the two, and the
//! prerequisite checks branch on it.

use std::fmt;

/// Detected platform information.
///
/// Derived once per invocation and threaded immutably through every
/// component that branches on host capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Darwin,
    /// Linux kernel under the Windows Subsystem for Linux.
    Wsl,
    Other,
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
    Other,
}

impl Platform {
    /// Detects the current platform. Infallible: unrecognized hosts are
    /// classified `Other`, never an error.
    pub fn detect() -> Self {
        Self {
            os: detect_os(),
            arch: detect_arch(),
        }
    }

    /// Returns the architecture string passed to the image build as
    /// `TARGETARCH`. Unrecognized architectures fall back to the amd64
    /// image family.
    pub fn build_arch(&self) -> &'static str {
        match self.arch {
            Arch::Arm64 => "arm64",
            Arch::Amd64 | Arch::Other => "amd64",
        }
    }

    /// True on ARM hosts, where the QEMU-backed kata variant is preferred.
    pub fn is_arm(&self) -> bool {
        self.arch == Arch::Arm64
    }

    /// True where the KVM device-node write check applies: bare Linux.
    /// WSL gets a softer read-only check instead.
    pub fn needs_kvm_check(&self) -> bool {
        self.os == Os::Linux
    }

    /// OS component of the kubectl download URL, if auto-install is
    /// supported for this platform.
    pub fn kubectl_os(&self) -> Option<&'static str> {
        match self.os {
            Os::Darwin => Some("darwin"),
            Os::Linux | Os::Wsl => Some("linux"),
            Os::Other => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OS={}, Arch={}", self.os, self.arch)
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Os::Linux => write!(f, "linux"),
            Os::Darwin => write!(f, "darwin"),
            Os::Wsl => write!(f, "wsl"),
            Os::Other => write!(f, "other"),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::Amd64 => write!(f, "amd64"),
            Arch::Arm64 => write!(f, "arm64"),
            Arch::Other => write!(f, "other"),
        }
    }
}

// =============================================================================
// Detection
// =============================================================================

fn detect_os() -> Os {
    #[cfg(target_os = "linux")]
    {
        if kernel_release_is_wsl() {
            return Os::Wsl;
        }
        Os::Linux
    }

    #[cfg(target_os = "macos")]
    {
        Os::Darwin
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        Os::Other
    }
}

fn detect_arch() -> Arch {
    #[cfg(target_arch = "x86_64")]
    return Arch::Amd64;

    #[cfg(target_arch = "aarch64")]
    return Arch::Arm64;

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    return Arch::Other;
}

/// WSL kernels advertise themselves in the release string
/// (e.g. `5.15.90.1-microsoft-standard-WSL2`).
#[cfg(target_os = "linux")]
fn kernel_release_is_wsl() -> bool {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|release| release.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}
