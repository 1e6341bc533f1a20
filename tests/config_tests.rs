//! Tests for the configuration loader.
//!
//! The invariant under test: absence of the file or of a key never fails
//! the pipeline — defaults always apply at the call site.

use cococtl::config::Config;
use cococtl::constants::{
    CFG_OPERATOR_VERSION, CFG_PAYLOAD_VERSION, DEFAULT_OPERATOR_VERSION, DEFAULT_PAYLOAD_VERSION,
};

// =============================================================================
// File Handling
// =============================================================================

#[test]
fn missing_file_yields_empty_mapping_not_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = Config::load(dir.path());

    assert!(config.is_empty());
    // Callers fall back to the documented defaults.
    assert_eq!(
        config.get_or(CFG_OPERATOR_VERSION, DEFAULT_OPERATOR_VERSION),
        "v0.12.0"
    );
    assert_eq!(
        config.get_or(CFG_PAYLOAD_VERSION, DEFAULT_PAYLOAD_VERSION),
        "v0.11.0"
    );
}

#[test]
fn known_keys_extracted_among_unknown_ones() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(
        dir.path().join("config.yaml"),
        "# infrastructure parameters\n\
         cluster_name: local\n\
         coco_operator_version: v0.13.0\n\
         some_future_knob: 42\n\
         coco_payload_version: \"v0.12.0\"\n",
    )
    .expect("write config");

    let config = Config::load(dir.path());
    assert_eq!(config.get(CFG_OPERATOR_VERSION), Some("v0.13.0"));
    assert_eq!(config.get(CFG_PAYLOAD_VERSION), Some("v0.12.0"));
    // Unknown keys are carried, not rejected; call sites simply ignore
    // the ones they don't recognize.
    assert_eq!(config.get("some_future_knob"), Some("42"));
}

#[test]
fn quotes_are_stripped_from_values() {
    let config = Config::parse("a: \"double\"\nb: 'single'\nc: bare\n");
    assert_eq!(config.get("a"), Some("double"));
    assert_eq!(config.get("b"), Some("single"));
    assert_eq!(config.get("c"), Some("bare"));
}

#[test]
fn malformed_content_degrades_to_what_parses() {
    let config = Config::parse(
        "]]] not yaml at all [[[\n\
         coco_operator_version: v0.12.0\n\
         just some prose\n",
    );
    // The one well-formed line still comes through.
    assert_eq!(config.get(CFG_OPERATOR_VERSION), Some("v0.12.0"));
    assert_eq!(config.len(), 1);
}

#[test]
fn value_colons_are_preserved() {
    // Only the first colon splits key from value.
    let config = Config::parse("image: registry.local:5000/coco:latest\n");
    assert_eq!(config.get("image"), Some("registry.local:5000/coco:latest"));
}
