//! Tests for manifest serialization.
//!
//! The CcRuntime wire format must be reproduced field-for-field for
//! operator compatibility, so these parse the serialized YAML back and
//! walk the structure rather than grepping strings.

use cococtl::manifest::{CcRuntime, ProbePod};
use cococtl::script::InstallScript;
use serde_yaml::Value;

fn cc_runtime_yaml() -> Value {
    let script = InstallScript::coco_default();
    let runtime = CcRuntime::coco_default("k8s.io/coco-payload:v0.11.0", &script);
    serde_yaml::from_str(&runtime.to_yaml().expect("serialize")).expect("reparse")
}

// =============================================================================
// CcRuntime Structure
// =============================================================================

#[test]
fn top_level_shape() {
    let doc = cc_runtime_yaml();

    assert_eq!(
        doc["apiVersion"].as_str(),
        Some("confidentialcontainers.org/v1beta1")
    );
    assert_eq!(doc["kind"].as_str(), Some("CcRuntime"));
    assert_eq!(doc["metadata"]["name"].as_str(), Some("cc-runtime"));
    assert_eq!(
        doc["metadata"]["namespace"].as_str(),
        Some("confidential-containers-system")
    );
}

#[test]
fn node_selector_bypasses_tee_hardware_traits() {
    let doc = cc_runtime_yaml();

    // Loose selector on purpose: the emulated host has no TEE traits.
    assert_eq!(
        doc["spec"]["ccNodeSelector"]["matchLabels"]["kubernetes.io/os"].as_str(),
        Some("linux")
    );
}

#[test]
fn install_config_fields() {
    let doc = cc_runtime_yaml();
    let config = &doc["spec"]["config"];

    assert_eq!(config["installType"].as_str(), Some("bundle"));
    assert_eq!(
        config["payloadImage"].as_str(),
        Some("k8s.io/coco-payload:v0.11.0")
    );
    assert_eq!(config["imagePullPolicy"].as_str(), Some("IfNotPresent"));

    let install_cmd = config["installCmd"].as_sequence().expect("installCmd");
    assert_eq!(install_cmd[0].as_str(), Some("/bin/sh"));
    assert_eq!(install_cmd[1].as_str(), Some("-c"));
    let script = install_cmd[2].as_str().expect("script text");
    assert!(script.ends_with("sleep infinity"));

    assert_eq!(
        config["uninstallCmd"][1].as_str(),
        Some("uninstall")
    );
    assert_eq!(config["cleanupCmd"][1].as_str(), Some("cleanup"));
}

#[test]
fn installer_volumes_pair_with_mounts() {
    let doc = cc_runtime_yaml();
    let config = &doc["spec"]["config"];

    let volumes = config["installerVolumes"].as_sequence().expect("volumes");
    let mounts = config["installerVolumeMounts"]
        .as_sequence()
        .expect("mounts");
    assert_eq!(volumes.len(), 3);
    assert_eq!(mounts.len(), 3);

    for (volume, mount) in volumes.iter().zip(mounts) {
        assert_eq!(volume["name"], mount["name"]);
        assert_eq!(volume["hostPath"]["path"], mount["mountPath"]);
        assert_eq!(
            volume["hostPath"]["type"].as_str(),
            Some("DirectoryOrCreate")
        );
    }

    let paths: Vec<&str> = volumes
        .iter()
        .map(|v| v["hostPath"]["path"].as_str().unwrap())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/opt/confidential-containers",
            "/etc/enclave-cc",
            "/etc/containerd"
        ]
    );
}

#[test]
fn environment_variables_satisfy_payload_entrypoint() {
    let doc = cc_runtime_yaml();
    let env = doc["spec"]["config"]["environmentVariables"]
        .as_sequence()
        .expect("env vars");

    // The payload entry script crashes when these are unset; an empty
    // JSON object, base64 encoded, satisfies it.
    let pairs: Vec<(&str, &str)> = env
        .iter()
        .map(|e| (e["name"].as_str().unwrap(), e["value"].as_str().unwrap()))
        .collect();
    assert_eq!(
        pairs,
        vec![("DECRYPT_CONFIG", "e30="), ("OCICRYPT_CONFIG", "e30=")]
    );
}

#[test]
fn runtime_classes_use_lowercase_pulltype() {
    let doc = cc_runtime_yaml();
    let classes = doc["spec"]["config"]["runtimeClasses"]
        .as_sequence()
        .expect("runtime classes");

    assert_eq!(classes.len(), 3);
    for class in classes {
        assert_eq!(class["snapshotter"].as_str(), Some("overlayfs"));
        // Operator schema spells it in one lowercase word.
        assert_eq!(class["pulltype"].as_str(), Some("auth"));
        assert!(class.get("pullType").is_none());
    }
}

// =============================================================================
// Probe Pod
// =============================================================================

#[test]
fn probe_pod_structure() {
    let pod = ProbePod::new("test-coco-start", "app=test-coco", "kata-qemu");
    let doc: Value = serde_yaml::from_str(&pod.to_yaml().expect("serialize")).expect("reparse");

    assert_eq!(doc["apiVersion"].as_str(), Some("v1"));
    assert_eq!(doc["kind"].as_str(), Some("Pod"));
    assert_eq!(doc["metadata"]["name"].as_str(), Some("test-coco-start"));
    assert_eq!(doc["metadata"]["labels"]["app"].as_str(), Some("test-coco"));
    // No namespace key: the probe lands in the default namespace.
    assert!(doc["metadata"].get("namespace").is_none());

    assert_eq!(doc["spec"]["restartPolicy"].as_str(), Some("Never"));
    assert_eq!(doc["spec"]["runtimeClassName"].as_str(), Some("kata-qemu"));

    let containers = doc["spec"]["containers"].as_sequence().expect("containers");
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0]["image"].as_str(), Some("nginx:alpine"));
}
