//! Tests for the payload build pipeline.

mod common;

use cococtl::config::Config;
use cococtl::error::Error;
use cococtl::payload::PayloadBuilder;
use cococtl::platform::{Arch, Os, Platform};
use common::MockRunner;
use std::sync::Arc;

fn arm64_darwin() -> Platform {
    Platform {
        os: Os::Darwin,
        arch: Arch::Arm64,
    }
}

/// Infra dir with the payload Dockerfile in place.
fn infra_with_payload() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    let payload = dir.path().join("containers/coco-payload");
    std::fs::create_dir_all(&payload).expect("payload dir");
    std::fs::write(payload.join("Dockerfile"), "FROM scratch\n").expect("dockerfile");
    dir
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test]
async fn build_generates_artifacts_and_invokes_nerdctl() {
    let runner = Arc::new(MockRunner::new());
    let infra = infra_with_payload();
    let builder = PayloadBuilder::new(runner.clone(), arm64_darwin(), infra.path());

    let image = builder.build(&Config::default()).await.expect("build");
    assert_eq!(image, "k8s.io/coco-payload:v0.11.0");

    // All three generated artifacts landed in the scratch context.
    let artifacts = infra.path().join("payload-build-ctx/artifacts");
    for name in ["enclave-cc.yaml", "config.json", "shim-rune-config.toml"] {
        assert!(artifacts.join(name).exists(), "missing artifact {}", name);
    }

    let build = runner
        .calls()
        .into_iter()
        .find(|inv| inv.program == "nerdctl")
        .expect("nerdctl invoked");
    assert!(build.has_args(&["--namespace", "k8s.io", "build"]));
    assert!(build.has_args(&["TARGETARCH=arm64"]));
    assert!(build.has_args(&["COCO_VERSION=v0.11.0"]));
    assert!(build.has_args(&["k8s.io/coco-payload:v0.11.0"]));
}

#[tokio::test]
async fn build_honours_configured_payload_version() {
    let runner = Arc::new(MockRunner::new());
    let infra = infra_with_payload();
    let builder = PayloadBuilder::new(runner.clone(), arm64_darwin(), infra.path());

    let config = Config::parse("coco_payload_version: v0.99.0\n");
    let image = builder.build(&config).await.expect("build");

    // The tag embeds the resolved version so a version change can never
    // silently reuse a stale local image.
    assert_eq!(image, "k8s.io/coco-payload:v0.99.0");
    let build = runner
        .calls()
        .into_iter()
        .find(|inv| inv.program == "nerdctl")
        .unwrap();
    assert!(build.has_args(&["COCO_VERSION=v0.99.0"]));
}

#[tokio::test]
async fn build_recreates_stale_context() {
    let runner = Arc::new(MockRunner::new());
    let infra = infra_with_payload();

    // Leftovers from a previous run must not survive.
    let stale = infra.path().join("payload-build-ctx/stale-file");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "old").unwrap();

    let builder = PayloadBuilder::new(runner, arm64_darwin(), infra.path());
    builder.build(&Config::default()).await.expect("build");

    assert!(!stale.exists(), "scratch context must be recreated fresh");
}

// =============================================================================
// Failure Modes
// =============================================================================

#[tokio::test]
async fn missing_payload_dir_fails_before_any_build() {
    let runner = Arc::new(MockRunner::new());
    let infra = tempfile::tempdir().expect("temp dir");
    let builder = PayloadBuilder::new(runner.clone(), arm64_darwin(), infra.path());

    let err = builder.build(&Config::default()).await.unwrap_err();
    assert!(matches!(err, Error::PayloadDirMissing(_)));
    assert!(runner.calls().is_empty(), "no external process was started");
}

#[tokio::test]
async fn failed_build_is_fatal_and_leaves_context_for_inspection() {
    let runner = Arc::new(MockRunner::new().on("nerdctl", "build", MockRunner::fail(1, "")));
    let infra = infra_with_payload();
    let builder = PayloadBuilder::new(runner, arm64_darwin(), infra.path());

    let err = builder.build(&Config::default()).await.unwrap_err();
    assert!(matches!(err, Error::BuildFailed(_)));

    // Post-mortem material stays on disk.
    assert!(infra.path().join("payload-build-ctx/artifacts").exists());
}
