//! Config hash stability.
//!
//! GREEN when:
//! - The same inputs hash identically across calls.
//! - Reordering keys within YAML doesn't change the hash.
//! - Different values produce different hashes.
//! - Overlays take effect and hash stably.

use ofr_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
source:
  path: "data/orders.json"
  format: "json"
window:
  mode: "time"
  step_ms: 1000
  initial_width_ms: 1000
pacing:
  tick_ms: 500
"#;

const BASE_YAML_REORDERED: &str = r#"
pacing:
  tick_ms: 500
window:
  initial_width_ms: 1000
  step_ms: 1000
  mode: "time"
source:
  format: "json"
  path: "data/orders.json"
"#;

const OVERLAY_YAML: &str = r#"
window:
  mode: "count"
  size_rows: 25
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(
        a.config_hash, b.config_hash,
        "same YAML input must produce identical hash"
    );
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
    assert_eq!(original.canonical_json, reordered.canonical_json);
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let modified = BASE_YAML.replace("step_ms: 1000", "step_ms: 2000");
    let b = load_layered_yaml_from_strings(&[modified.as_str()]).unwrap();

    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn merged_layers_produce_stable_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);

    let mode = a
        .config_json
        .pointer("/window/mode")
        .and_then(|v| v.as_str())
        .unwrap();
    assert_eq!(mode, "count", "overlay should override base window.mode");

    // Base keys survive the overlay.
    assert_eq!(
        a.config_json.pointer("/window/step_ms").and_then(|v| v.as_u64()),
        Some(1000)
    );
}

#[test]
fn layer_order_matters() {
    let ab = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let ba = load_layered_yaml_from_strings(&[OVERLAY_YAML, BASE_YAML]).unwrap();
    assert_ne!(ab.config_hash, ba.config_hash);
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}
