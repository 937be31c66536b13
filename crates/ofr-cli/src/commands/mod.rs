//! Command handler modules for the `ofr` binary.
//!
//! Shared helpers live here; command-specific logic lives in the submodules.

pub mod inspect;
pub mod replay;

use anyhow::{Context, Result};
use ofr_config::ConfigMode;
use ofr_eventlog::{EventLog, SourceFormat};
use std::path::Path;

/// Parse a CLI `--mode` string into a [`ConfigMode`].
pub fn parse_config_mode(mode: &str) -> Result<ConfigMode> {
    mode.parse::<ConfigMode>()
        .with_context(|| format!("invalid --mode '{}'. expected one of: time | count", mode))
}

/// Load an order log, with an optional explicit format.
pub fn load_log(path: &Path, format: Option<&str>) -> Result<EventLog> {
    let log = match format {
        Some(f) => {
            let fmt = SourceFormat::parse(f).with_context(|| format!("invalid format '{}'", f))?;
            ofr_eventlog::load_path_as(path, fmt)
        }
        None => ofr_eventlog::load_path(path),
    }
    .with_context(|| format!("load order log failed: {}", path.display()))?;
    Ok(log)
}
