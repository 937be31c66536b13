//! Consumed-key registry and unused-key guard.
//!
//! "Consumed pointers" are JSON Pointer prefixes. A leaf under any consumed
//! prefix is consumed; every other leaf is reported as unused. Callers pick
//! whether that is a warning or an error.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    Time,
    Count,
}

impl ConfigMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigMode::Time => "TIME",
            ConfigMode::Count => "COUNT",
        }
    }
}

impl FromStr for ConfigMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(ConfigMode::Time),
            "count" | "box" => Ok(ConfigMode::Count),
            other => bail!("unknown window mode '{}': expected time|count", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub mode: String,
    /// Consumed prefixes used for this analysis (sorted, unique).
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted).
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Pointers actually read by `ReplaySettings::from_config_json` in each mode.
pub fn consumed_pointers_for_mode(mode: ConfigMode) -> &'static [&'static str] {
    match mode {
        ConfigMode::Time => &[
            "/source/path",
            "/source/format",
            "/window/mode",
            "/window/step_ms",
            "/window/initial_width_ms",
            "/pacing/tick_ms",
            "/pacing/max_ticks",
            "/ledger/apply",
            "/export/anomalies_path",
            "/export/hash_chain",
        ],
        ConfigMode::Count => &[
            "/source/path",
            "/source/format",
            "/window/mode",
            "/window/size_rows",
            "/pacing/tick_ms",
            "/pacing/max_ticks",
            "/ledger/apply",
            "/export/anomalies_path",
            "/export/hash_chain",
        ],
    }
}

/// Produce an unused-key report for `mode`.
///
/// With [`UnusedKeyPolicy::Fail`] any unused leaf is an error; with
/// [`UnusedKeyPolicy::Warn`] the report is always returned.
pub fn report_unused_keys(
    mode: ConfigMode,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed_prefixes: Vec<String> = consumed_pointers_for_mode(mode)
        .iter()
        .map(|p| normalize_pointer(p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);
    let unused: Vec<String> = leaves
        .into_iter()
        .filter(|leaf| !consumed_prefixes.iter().any(|c| consumes(c, leaf)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let report = UnusedKeyReport {
        mode: mode.as_str().to_string(),
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let shown: Vec<&str> = report
            .unused_leaf_pointers
            .iter()
            .take(12)
            .map(String::as_str)
            .collect();
        bail!(
            "CONFIG_UNUSED_KEYS mode={} count={}: not read in this mode: {}",
            report.mode,
            report.unused_leaf_pointers.len(),
            shown.join(", ")
        );
    }

    Ok(report)
}

/// Leading "/", no trailing "/" unless the pointer is just "/".
fn normalize_pointer(p: &str) -> String {
    let body = p.trim().trim_matches('/');
    format!("/{}", body)
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc"; "/" consumes all.
fn consumes(prefix: &str, leaf: &str) -> bool {
    match leaf.strip_prefix(prefix) {
        _ if prefix == "/" => true,
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Append the JSON pointer of every scalar under `v` to `out`.
fn collect_leaf_pointers(v: &Value, at: &str, out: &mut Vec<String>) {
    let children: Vec<(String, &Value)> = match v {
        Value::Object(map) => map
            .iter()
            .map(|(k, child)| (k.replace('~', "~0").replace('/', "~1"), child))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, child)| (i.to_string(), child))
            .collect(),
        _ => {
            out.push(if at.is_empty() { "/" } else { at }.to_string());
            return;
        }
    };
    for (token, child) in children {
        collect_leaf_pointers(child, &format!("{at}/{token}"), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_respects_segment_boundary() {
        assert!(consumes("/window/step_ms", "/window/step_ms"));
        assert!(consumes("/source", "/source/path"));
        assert!(!consumes("/source", "/sources/path"));
        assert!(consumes("/", "/anything"));
    }

    #[test]
    fn normalize_adds_leading_and_strips_trailing_slash() {
        assert_eq!(normalize_pointer("a/b/"), "/a/b");
        assert_eq!(normalize_pointer("/window"), "/window");
        assert_eq!(normalize_pointer(""), "/");
    }

    #[test]
    fn pointer_tokens_are_escaped() {
        let mut out = Vec::new();
        collect_leaf_pointers(&serde_json::json!({"a/b": {"c~d": 1}}), "", &mut out);
        assert_eq!(out, vec!["/a~1b/c~0d".to_string()]);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Time".parse::<ConfigMode>().unwrap(), ConfigMode::Time);
        assert_eq!("COUNT".parse::<ConfigMode>().unwrap(), ConfigMode::Count);
        assert!("rows".parse::<ConfigMode>().is_err());
    }
}
