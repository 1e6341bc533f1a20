//! Error types for the deployment orchestration layer.

use std::time::Duration;

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while provisioning or validating the runtime.
///
/// The taxonomy matters for callers: tool/connectivity/apply/build errors
/// abort the current operation; timeouts are a distinct outcome surfaced
/// with a diagnostic dump rather than a bare failure message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Prerequisite Errors
    // =========================================================================
    /// A required CLI tool is not resolvable on PATH.
    #[error("required tool not found: {tool} ({hint})")]
    ToolMissing { tool: String, hint: String },

    /// The cluster control plane did not answer an introspection call.
    #[error("cannot connect to Kubernetes cluster: {reason}")]
    ClusterUnreachable { reason: String },

    // =========================================================================
    // Command Execution Errors
    // =========================================================================
    /// An external command exited non-zero.
    #[error("{program} failed (exit {code}): {stderr}")]
    CommandFailed {
        program: String,
        args: Vec<String>,
        code: i32,
        stderr: String,
    },

    /// An external command could not be spawned at all.
    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },

    // =========================================================================
    // Build Errors
    // =========================================================================
    /// The payload build context could not be prepared.
    #[error("failed to prepare build context at {path}: {reason}")]
    BuildContextFailed { path: String, reason: String },

    /// The payload directory with the Dockerfile is missing.
    #[error("payload directory not found at {0}")]
    PayloadDirMissing(String),

    /// The external image build exited non-zero.
    #[error("payload image build failed: {0}")]
    BuildFailed(String),

    // =========================================================================
    // Cluster Mutation Errors
    // =========================================================================
    /// A declarative manifest apply was rejected by the cluster.
    #[error("failed to apply {what}: {reason}")]
    ManifestApply { what: String, reason: String },

    // =========================================================================
    // Readiness / Timeout Errors
    // =========================================================================
    /// A CRD did not reach the established condition within budget.
    #[error("CRD {crd} not established after {timeout:?}")]
    CrdNotReady { crd: String, timeout: Duration },

    /// A runtime class never appeared on the cluster.
    #[error(
        "runtime class '{0}' not found after waiting; is the operator pod running without errors?"
    )]
    RuntimeClassNotReady(String),

    /// The probe pod did not reach the Running phase within budget.
    #[error("pod '{pod}' failed to reach Running within {timeout:?}")]
    PodNotRunning { pod: String, timeout: Duration },

    // =========================================================================
    // Selection Errors
    // =========================================================================
    /// No usable runtime class is registered on the cluster.
    #[error("no CoCo runtime classes (enclave-cc, kata*) found; run 'cococtl setup' first")]
    NoRuntimeClass,

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest serialization error.
    #[error("manifest serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

impl Error {
    /// True for outcomes that represent a bounded wait running out rather
    /// than a hard failure. Callers surface these with a diagnostic dump.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::CrdNotReady { .. } | Error::RuntimeClassNotReady(_) | Error::PodNotRunning { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_taxonomy() {
        let timeout = Error::PodNotRunning {
            pod: "test-coco-start".to_string(),
            timeout: Duration::from_secs(300),
        };
        assert!(timeout.is_timeout());

        let fatal = Error::NoRuntimeClass;
        assert!(!fatal.is_timeout());
    }

    #[test]
    fn command_failure_message_carries_stderr() {
        let err = Error::CommandFailed {
            program: "kubectl".to_string(),
            args: vec!["apply".to_string()],
            code: 1,
            stderr: "forbidden".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("kubectl"));
        assert!(msg.contains("exit 1"));
        assert!(msg.contains("forbidden"));
    }
}
