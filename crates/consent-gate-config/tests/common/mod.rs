// crates/consent-gate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for consent-gate-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::BTreeMap;

use consent_gate_config::ConsentGateConfig;

/// Parses a TOML string into a `ConsentGateConfig` without validation.
pub fn config_from_toml(toml_str: &str) -> Result<ConsentGateConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<ConsentGateConfig, toml::de::Error> {
    config_from_toml("")
}

/// Builds an environment lookup backed by fixed pairs.
pub fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let values: BTreeMap<String, String> =
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    move |key| values.get(key).cloned()
}
