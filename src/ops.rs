//! Top-level operations.
//!
//! Each operation is a linear pipeline over an injected [`Context`] that
//! short-circuits on the first step failure. Mutating operations are
//! gated by the prerequisite check; the check itself is idempotent and
//! cheap enough to run every time.
//!
//! Nothing here holds durable state: every run reconstructs what it needs
//! from host introspection, the config file, and the cluster, which is
//! the sole source of truth between runs.

use crate::cluster::ClusterMutator;
use crate::config::Config;
use crate::constants::{
    payload_image, CC_RUNTIME_CRD, CFG_OPERATOR_VERSION, CFG_PAYLOAD_VERSION, CRD_TIMEOUT,
    DEFAULT_OPERATOR_VERSION, DEFAULT_PAYLOAD_VERSION, OPERATOR_NAMESPACE, POLL_INTERVAL,
};
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, HostRunner};
use crate::kubectl::Kubectl;
use crate::manifest::CcRuntime;
use crate::payload::PayloadBuilder;
use crate::platform::Platform;
use crate::poll::poll_until;
use crate::prereqs::{PrereqChecker, ToolLookup};
use crate::script::InstallScript;
use crate::ui::{Confirm, OutputStyle, StdinConfirm};
use crate::validate::Validator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

// =============================================================================
// Context
// =============================================================================

/// Everything an operation pipeline needs, threaded explicitly so tests
/// can swap in a scripted runner and a canned confirmer.
pub struct Context {
    pub runner: Arc<dyn CommandRunner>,
    pub platform: Platform,
    pub infra_dir: PathBuf,
    pub confirm: Arc<dyn Confirm>,
    pub style: OutputStyle,
    pub tool_lookup: ToolLookup,
}

impl Context {
    /// Context wired to the real host: process runner, detected platform,
    /// interactive confirmation, real PATH lookup.
    pub fn host(infra_dir: PathBuf, style: OutputStyle) -> Self {
        Self {
            runner: Arc::new(HostRunner::new()),
            platform: Platform::detect(),
            infra_dir,
            confirm: Arc::new(StdinConfirm::new(style)),
            style,
            tool_lookup: crate::exec::which,
        }
    }

    fn kubectl(&self) -> Kubectl {
        Kubectl::new(self.runner.clone())
    }

    fn checker(&self) -> PrereqChecker {
        PrereqChecker::with_lookup(
            self.runner.clone(),
            self.platform,
            self.confirm.clone(),
            self.tool_lookup,
        )
    }
}

// =============================================================================
// Operations
// =============================================================================

/// `check-prereqs`: standalone environment verification.
pub async fn check_prereqs(ctx: &Context) -> Result<()> {
    ctx.style.section("Checking Prerequisites");
    ctx.checker().check().await
}

/// `build`: assemble the payload build context and drive the image build.
pub async fn build(ctx: &Context) -> Result<()> {
    check_prereqs(ctx).await?;

    ctx.style.section("Building Custom CoCo Payload");
    let config = Config::load(&ctx.infra_dir);
    let builder = PayloadBuilder::new(ctx.runner.clone(), ctx.platform, &ctx.infra_dir);
    builder.build(&config).await?;
    Ok(())
}

/// `setup`: install the operator and submit the CcRuntime resource.
pub async fn setup(ctx: &Context) -> Result<()> {
    check_prereqs(ctx).await?;

    ctx.style.section("Setting up Confidential Containers");
    let kubectl = ctx.kubectl();
    let mutator = ClusterMutator::new(kubectl.clone());

    mutator.label_nodes().await;

    let config = Config::load(&ctx.infra_dir);
    let operator_version = config.get_or(CFG_OPERATOR_VERSION, DEFAULT_OPERATOR_VERSION);
    mutator.apply_operator(operator_version).await?;

    info!("waiting for operator to initialize");
    wait_for_crd_established(&kubectl).await?;

    let payload_version = config.get_or(CFG_PAYLOAD_VERSION, DEFAULT_PAYLOAD_VERSION);
    let image = payload_image(payload_version);
    let script = InstallScript::coco_default();
    let runtime = CcRuntime::coco_default(&image, &script);
    mutator.apply_cc_runtime(&runtime).await?;

    info!("setup complete; the operator will now install the runtime classes");
    info!(
        "check progress with: kubectl get pods -n {}",
        OPERATOR_NAMESPACE
    );
    Ok(())
}

/// `validate`: prove the installed runtime works end-to-end.
pub async fn validate(ctx: &Context) -> Result<()> {
    check_prereqs(ctx).await?;

    ctx.style.section("Validating CoCo Installation");
    Validator::new(ctx.kubectl(), ctx.platform).validate().await
}

// =============================================================================
// Concrete Poller Instantiations
// =============================================================================

/// Waits for the CcRuntime CRD to report its `Established` condition.
/// The operator registers the CRD asynchronously after its manifests are
/// applied; nothing downstream can be submitted before this.
async fn wait_for_crd_established(kubectl: &Kubectl) -> Result<()> {
    info!(crd = CC_RUNTIME_CRD, "waiting for CRD to be established");
    let result = poll_until(
        move || async move {
            match kubectl.crd_established_status(CC_RUNTIME_CRD).await {
                Ok(Some(status)) if status == "True" => Some(status),
                // Not found yet, condition unset, or a transient query
                // error: all count as "not yet ready".
                _ => None,
            }
        },
        POLL_INTERVAL,
        CRD_TIMEOUT,
    )
    .await;

    if !result.succeeded {
        return Err(Error::CrdNotReady {
            crd: CC_RUNTIME_CRD.to_string(),
            timeout: CRD_TIMEOUT,
        });
    }
    info!(crd = CC_RUNTIME_CRD, "CRD is ready");
    Ok(())
}
