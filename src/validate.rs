//! End-to-end validation.
//!
//! Proves the installed runtime actually works by deploying a disposable
//! probe pod pinned to the selected runtime class and waiting for it to
//! reach the Running phase. The phase is the sole pass/fail criterion;
//! the in-pod kernel check afterwards is a human-readable confirmation
//! signal only.

use crate::constants::{
    POD_TIMEOUT, POLL_INTERVAL, PROBE_POD_LABEL, PROBE_POD_NAME, PROBE_POD_NAMESPACE,
    RUNTIME_CLASS_ATTEMPTS,
};
use crate::error::{Error, Result};
use crate::kubectl::Kubectl;
use crate::manifest::ProbePod;
use crate::platform::Platform;
use crate::poll::{attempts_budget, poll_until};
use crate::selector::select_runtime_class;
use tracing::{error, info, warn};

/// Validates the CoCo installation with a probe pod.
pub struct Validator {
    kubectl: Kubectl,
    platform: Platform,
}

impl Validator {
    pub fn new(kubectl: Kubectl, platform: Platform) -> Self {
        Self { kubectl, platform }
    }

    /// Runs the full validation sequence.
    pub async fn validate(&self) -> Result<()> {
        info!("checking available RuntimeClasses");
        // A failed listing means no classes observable right now; the
        // selector turns an empty set into the actionable error.
        let candidates = self
            .kubectl
            .runtime_class_names()
            .await
            .unwrap_or_default();
        info!(?candidates, "found RuntimeClasses");

        let runtime_class = select_runtime_class(&candidates, &self.platform)?;
        info!(runtime_class, "target RuntimeClass");

        self.wait_for_runtime_class(runtime_class).await?;
        self.deploy_probe_pod(runtime_class).await?;
        self.wait_for_probe_running().await
    }

    /// The operator registers classes asynchronously after `setup`
    /// returns, so the selected class may not exist yet.
    async fn wait_for_runtime_class(&self, name: &str) -> Result<()> {
        info!(name, "waiting for RuntimeClass to be available");
        let kubectl = &self.kubectl;
        let result = poll_until(
            move || async move {
                match kubectl.runtime_class_exists(name).await {
                    Ok(true) => Some(name.to_string()),
                    // Transient query errors count as "not yet ready".
                    Ok(false) | Err(_) => None,
                }
            },
            POLL_INTERVAL,
            attempts_budget(RUNTIME_CLASS_ATTEMPTS, POLL_INTERVAL),
        )
        .await;

        if !result.succeeded {
            return Err(Error::RuntimeClassNotReady(name.to_string()));
        }
        Ok(())
    }

    /// Deletes any prior probe of the same name, then submits a fresh
    /// one. The delete blocks until the old pod is gone so the new probe
    /// starts clean.
    async fn deploy_probe_pod(&self, runtime_class: &str) -> Result<()> {
        info!(pod = PROBE_POD_NAME, "deploying test pod");
        self.kubectl.delete_pod(PROBE_POD_NAME).await?;

        let pod = ProbePod::new(PROBE_POD_NAME, PROBE_POD_LABEL, runtime_class);
        self.kubectl.apply_stdin(&pod.to_yaml()?).await
    }

    async fn wait_for_probe_running(&self) -> Result<()> {
        info!(
            selector = PROBE_POD_LABEL,
            namespace = PROBE_POD_NAMESPACE,
            "waiting for pod to be Running"
        );
        let kubectl = &self.kubectl;
        let result = poll_until(
            move || async move {
                match kubectl.pod_phase(PROBE_POD_NAMESPACE, PROBE_POD_LABEL).await {
                    Ok(Some(phase)) if phase == "Running" => Some(phase),
                    _ => None,
                }
            },
            POLL_INTERVAL,
            POD_TIMEOUT,
        )
        .await;

        if !result.succeeded {
            error!(pod = PROBE_POD_NAME, "pod failed to start or timed out");
            self.dump_pod_events().await;
            return Err(Error::PodNotRunning {
                pod: PROBE_POD_NAME.to_string(),
                timeout: POD_TIMEOUT,
            });
        }

        info!(pod = PROBE_POD_NAME, "pod is RUNNING");
        self.report_pod_kernel().await;
        Ok(())
    }

    /// Benign in-pod introspection as a confirmation signal. A kernel
    /// string that differs from the host's is the visible hint that the
    /// pod runs under the isolated runtime. Never a pass/fail gate.
    async fn report_pod_kernel(&self) {
        match self
            .kubectl
            .exec_in_pod(PROBE_POD_NAME, &["uname", "-r"])
            .await
        {
            Ok(kernel) => {
                info!(%kernel, "pod kernel");
                info!("verification successful: pod started with CoCo runtime");
            }
            Err(e) => warn!(error = %e, "could not check kernel version inside pod"),
        }
    }

    /// Timeout diagnosis: the tail of the pod's descriptive events.
    async fn dump_pod_events(&self) {
        match self.kubectl.describe_pod(PROBE_POD_NAME).await {
            Ok(description) => {
                info!("pod description (last 20 lines):");
                let lines: Vec<&str> = description.lines().collect();
                let tail = lines.len().saturating_sub(20);
                for line in &lines[tail..] {
                    println!("{}", line);
                }
            }
            Err(e) => warn!(error = %e, "could not describe pod"),
        }
    }
}
