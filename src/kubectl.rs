//! Typed wrapper around the cluster CLI.
//!
//! All cluster interactions go through this client, which funnels into the
//! [`CommandRunner`] boundary: declarative applies take manifest text on
//! stdin, reads are imperative `get`/`describe`/`exec` queries. The client
//! never waits for convergence; that is the poller's job.

use crate::error::{Error, Result};
use crate::exec::{command_error, CmdOutput, CommandRunner};
use std::sync::Arc;
use tracing::debug;

/// Cluster CLI client.
#[derive(Clone)]
pub struct Kubectl {
    runner: Arc<dyn CommandRunner>,
}

impl Kubectl {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Runs `kubectl` with the given arguments, treating a non-zero exit
    /// as an error carrying the failed argv and stderr.
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.run_raw(args, None).await?;
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        if !output.is_success() {
            return Err(command_error("kubectl", &args, &output));
        }
        Ok(output.stdout_trimmed().to_string())
    }

    /// Runs `kubectl` with manifest text piped to stdin.
    pub async fn run_with_stdin(&self, args: &[&str], stdin: &str) -> Result<String> {
        let output = self.run_raw(args, Some(stdin)).await?;
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        if !output.is_success() {
            return Err(command_error("kubectl", &args, &output));
        }
        Ok(output.stdout_trimmed().to_string())
    }

    async fn run_raw(&self, args: &[&str], stdin: Option<&str>) -> Result<CmdOutput> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.runner.run("kubectl", &args, stdin).await
    }

    // =========================================================================
    // Connectivity
    // =========================================================================

    /// Lightweight control-plane introspection. Any error is fatal for the
    /// whole run.
    pub async fn cluster_info(&self) -> Result<()> {
        self.run(&["cluster-info"])
            .await
            .map_err(|e| Error::ClusterUnreachable {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    // =========================================================================
    // Declarative Mutation
    // =========================================================================

    /// Applies manifest text via stdin (`kubectl apply -f -`).
    pub async fn apply_stdin(&self, manifest: &str) -> Result<()> {
        self.run_with_stdin(&["apply", "-f", "-"], manifest).await?;
        Ok(())
    }

    /// Applies a remote kustomize bundle (`kubectl apply -k <url>`).
    pub async fn apply_kustomize(&self, url: &str) -> Result<()> {
        self.run(&["apply", "-k", url]).await?;
        Ok(())
    }

    /// Labels every node with `--overwrite` so repeated runs converge
    /// instead of failing on already-present labels.
    pub async fn label_all_nodes(&self, label: &str) -> Result<()> {
        self.run(&["label", "nodes", "--all", label, "--overwrite"])
            .await?;
        Ok(())
    }

    // =========================================================================
    // Read Queries
    // =========================================================================

    /// Names of every runtime class registered on the cluster.
    pub async fn runtime_class_names(&self) -> Result<Vec<String>> {
        let out = self
            .run(&[
                "get",
                "runtimeclass",
                "-o",
                "jsonpath={.items[*].metadata.name}",
            ])
            .await?;
        Ok(out.split_whitespace().map(|s| s.to_string()).collect())
    }

    /// True if the named runtime class exists right now.
    pub async fn runtime_class_exists(&self, name: &str) -> Result<bool> {
        let output = self.run_raw(&["get", "runtimeclass", name], None).await?;
        Ok(output.is_success())
    }

    /// Status of a CRD's `Established` condition: `Some("True")` once the
    /// control plane has validated and activated the schema.
    pub async fn crd_established_status(&self, crd: &str) -> Result<Option<String>> {
        let output = self
            .run_raw(
                &[
                    "get",
                    "crd",
                    crd,
                    "-o",
                    r#"jsonpath={.status.conditions[?(@.type=="Established")].status}"#,
                ],
                None,
            )
            .await?;
        if !output.is_success() {
            return Ok(None);
        }
        let status = output.stdout_trimmed().trim_matches('\'');
        if status.is_empty() {
            Ok(None)
        } else {
            Ok(Some(status.to_string()))
        }
    }

    /// Phase of the first pod matching a label selector, from the full
    /// JSON object rather than a jsonpath expression, so an empty item
    /// list is distinguishable from a query failure.
    pub async fn pod_phase(&self, namespace: &str, selector: &str) -> Result<Option<String>> {
        let output = self
            .run_raw(
                &["get", "pods", "-n", namespace, "-l", selector, "-o", "json"],
                None,
            )
            .await?;
        if !output.is_success() {
            return Ok(None);
        }

        let parsed: serde_json::Value = match serde_json::from_str(&output.stdout) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "unparseable pod list, treating as not ready");
                return Ok(None);
            }
        };

        Ok(parsed["items"]
            .get(0)
            .and_then(|pod| pod["status"]["phase"].as_str())
            .map(|s| s.to_string()))
    }

    // =========================================================================
    // Probe Pod Plumbing
    // =========================================================================

    /// Deletes a pod, tolerating absence, blocking until it is gone so a
    /// re-created probe of the same name starts clean.
    pub async fn delete_pod(&self, name: &str) -> Result<()> {
        self.run(&[
            "delete",
            "pod",
            name,
            "--ignore-not-found=true",
            "--wait=true",
        ])
        .await?;
        Ok(())
    }

    /// Recent descriptive events for a pod, for timeout diagnosis.
    pub async fn describe_pod(&self, name: &str) -> Result<String> {
        self.run(&["describe", "pod", name]).await
    }

    /// Executes a command inside a running pod, capturing stdout.
    pub async fn exec_in_pod(&self, name: &str, command: &[&str]) -> Result<String> {
        let mut args = vec!["exec", name, "--"];
        args.extend_from_slice(command);
        self.run(&args).await
    }
}
