//! Runtime class selection.
//!
//! Chooses among the runtime classes registered on the cluster by an
//! explicit priority policy: prefer the most specific signal that the
//! CoCo install actually succeeded over a generic default, and never fall
//! back silently when nothing usable is present.

use crate::constants::{RC_ENCLAVE_CC, RC_KATA, RC_KATA_QEMU};
use crate::error::{Error, Result};
use crate::platform::Platform;
use tracing::info;

/// Selects the runtime class to validate against.
///
/// Priority, first match wins:
/// 1. `enclave-cc` — created by the simulation payload, so its presence
///    proves the CoCo install completed.
/// 2. `kata-qemu` — only on non-x86 hosts, where the QEMU variant is the
///    one tuned for emulation.
/// 3. `kata` — generic fallback.
///
/// An empty candidate set is a fatal, user-actionable error, not a
/// default.
pub fn select_runtime_class(candidates: &[String], platform: &Platform) -> Result<&'static str> {
    let has = |name: &str| candidates.iter().any(|c| c == name);

    if has(RC_ENCLAVE_CC) {
        info!("selection: using 'enclave-cc' (detected from CoCo installation)");
        return Ok(RC_ENCLAVE_CC);
    }
    if has(RC_KATA_QEMU) && platform.is_arm() {
        info!("selection: using 'kata-qemu' (optimized for ARM64/emulation)");
        return Ok(RC_KATA_QEMU);
    }
    if has(RC_KATA) {
        info!("selection: using generic 'kata'");
        return Ok(RC_KATA);
    }

    Err(Error::NoRuntimeClass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os};

    fn arm64() -> Platform {
        Platform {
            os: Os::Darwin,
            arch: Arch::Arm64,
        }
    }

    fn amd64() -> Platform {
        Platform {
            os: Os::Linux,
            arch: Arch::Amd64,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn enclave_cc_wins_when_present() {
        let candidates = names(&["kata", "kata-qemu", "enclave-cc"]);
        assert_eq!(
            select_runtime_class(&candidates, &arm64()).unwrap(),
            "enclave-cc"
        );
    }

    #[test]
    fn qemu_variant_preferred_on_arm() {
        let candidates = names(&["kata-qemu", "kata"]);
        assert_eq!(
            select_runtime_class(&candidates, &arm64()).unwrap(),
            "kata-qemu"
        );
    }

    #[test]
    fn qemu_variant_skipped_on_x86() {
        let candidates = names(&["kata-qemu", "kata"]);
        assert_eq!(select_runtime_class(&candidates, &amd64()).unwrap(), "kata");
    }

    #[test]
    fn generic_kata_as_fallback() {
        let candidates = names(&["kata"]);
        assert_eq!(select_runtime_class(&candidates, &arm64()).unwrap(), "kata");
    }

    #[test]
    fn empty_set_is_fatal_never_a_default() {
        let err = select_runtime_class(&[], &arm64()).unwrap_err();
        assert!(matches!(err, Error::NoRuntimeClass));
        // The diagnostic tells the operator what to do next.
        assert!(err.to_string().contains("setup"));
    }

    #[test]
    fn unknown_classes_are_ignored() {
        let candidates = names(&["gvisor", "crun"]);
        assert!(select_runtime_class(&candidates, &amd64()).is_err());
    }
}
