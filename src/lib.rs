//! # cococtl
//!
//! **Confidential Containers provisioning for Rancher Desktop**
//!
//! This crate provisions, builds, and validates the Confidential
//! Containers (CoCo) stack on a local Kubernetes-compatible cluster whose
//! host diverges from the operator's default assumptions: the Rancher
//! Desktop VM is Alpine/OpenRC rather than systemd, runs on macOS
//! (ARM64/Intel), Linux, or WSL2, and has no TEE hardware, so the
//! simulation payload stands in for hardware-backed support.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            cococtl                                  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │   check-prereqs          build            setup         validate    │
//! │        │                   │                │               │       │
//! │  ┌─────┴─────┐      ┌──────┴─────┐   ┌─────┴─────┐   ┌─────┴─────┐ │
//! │  │ Prereq    │      │ Payload    │   │ Cluster   │   │ Selector  │ │
//! │  │ Checker   │      │ Builder    │   │ Mutator   │   │ Validator │ │
//! │  └─────┬─────┘      └──────┬─────┘   └─────┬─────┘   └─────┬─────┘ │
//! │        │                   │               │               │       │
//! │  ┌─────┴───────────────────┴───────────────┴───────────────┴─────┐ │
//! │  │   Platform · Config · InstallScript · Manifests · Poller      │ │
//! │  └───────────────────────────────┬───────────────────────────────┘ │
//! │                                  │                                 │
//! │  ┌───────────────────────────────┴───────────────────────────────┐ │
//! │  │        CommandRunner boundary (kubectl · nerdctl · curl)      │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Design Points
//!
//! - **One command boundary**: every external interaction (cluster CLI,
//!   image build, downloads) funnels through [`exec::CommandRunner`], so
//!   the pipelines are drivable against a scripted runner in tests.
//! - **Apply semantics everywhere**: cluster mutations are declarative
//!   create-or-update; `setup` is safe to re-run and nothing is rolled
//!   back on failure. The cluster is the sole source of truth between
//!   runs.
//! - **One polling primitive**: all waiting on asynchronous cluster state
//!   is blocking bounded-retry polling via [`poll::poll_until`] with
//!   explicit interval and timeout; there are no event subscriptions.
//! - **The init-system bridge**: the [`script::InstallScript`] rewrites
//!   the operator's systemd-era install assumptions for an OpenRC host,
//!   entering the host mount namespace explicitly for every step that
//!   must outlive the install container.
//!
//! # Example
//!
//! ```rust,ignore
//! use cococtl::{ops, ui::OutputStyle};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> cococtl::Result<()> {
//!     let ctx = ops::Context::host("infrastructure".into(), OutputStyle::default());
//!     ops::setup(&ctx).await?;
//!     ops::validate(&ctx).await
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod exec;
pub mod kubectl;
pub mod manifest;
pub mod ops;
pub mod payload;
pub mod platform;
pub mod poll;
pub mod prereqs;
pub mod script;
pub mod selector;
pub mod ui;
pub mod validate;

// Re-exports
pub use cluster::ClusterMutator;
pub use config::Config;
pub use error::{Error, Result};
pub use exec::{CmdOutput, CommandRunner, HostRunner};
pub use kubectl::Kubectl;
pub use manifest::{CcRuntime, ProbePod};
pub use platform::{Arch, Os, Platform};
pub use poll::{attempts_budget, poll_until, PollResult};
pub use script::{InstallScript, Step};
pub use selector::select_runtime_class;
pub use ui::{Confirm, FixedConfirm, OutputStyle};
pub use validate::Validator;
