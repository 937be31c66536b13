use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::consumption::ConfigMode;

const DEFAULT_STEP_MS: u64 = 1_000;
const DEFAULT_SIZE_ROWS: usize = 100;
const DEFAULT_TICK_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WindowSettings {
    Time { step_ms: u64, initial_width_ms: u64 },
    Count { size_rows: usize },
}

impl WindowSettings {
    pub fn mode(&self) -> ConfigMode {
        match self {
            WindowSettings::Time { .. } => ConfigMode::Time,
            WindowSettings::Count { .. } => ConfigMode::Count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacingSettings {
    pub tick_ms: u64,
    /// `None` runs until the tail is flushed.
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSettings {
    pub anomalies_path: Option<PathBuf>,
    pub hash_chain: bool,
}

/// Typed view of the replay config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySettings {
    pub source_path: PathBuf,
    /// `json` or `csv`; `None` infers from the file extension.
    pub source_format: Option<String>,
    pub window: WindowSettings,
    pub pacing: PacingSettings,
    /// `false` runs every tick as a preview.
    pub apply_to_ledger: bool,
    pub export: ExportSettings,
}

impl ReplaySettings {
    /// Extract and validate settings from a merged config.
    ///
    /// Only `source.path` is required. Window keys of the other mode are
    /// ignored here; the unused-key report flags them.
    pub fn from_config_json(v: &Value) -> Result<Self> {
        let source_path = match v.pointer("/source/path") {
            Some(Value::String(s)) if !s.trim().is_empty() => PathBuf::from(s.trim()),
            Some(_) => bail!("CONFIG_INVALID key=/source/path: expected a non-empty string"),
            None => bail!("CONFIG_MISSING key=/source/path"),
        };

        let source_format = match read_str(v, "/source/format")?.map(str::to_ascii_lowercase) {
            None => None,
            Some(f) if f == "json" || f == "csv" => Some(f),
            Some(f) => bail!("CONFIG_INVALID key=/source/format: '{}' (expected json|csv)", f),
        };

        let mode = match read_str(v, "/window/mode")? {
            Some(s) => s
                .parse::<ConfigMode>()
                .context("CONFIG_INVALID key=/window/mode")?,
            None => ConfigMode::Time,
        };
        let window = window_for_mode(v, mode)?;

        let tick_ms = read_u64(v, "/pacing/tick_ms")?.unwrap_or(DEFAULT_TICK_MS);
        if tick_ms == 0 {
            bail!("CONFIG_INVALID key=/pacing/tick_ms: must be > 0");
        }
        let max_ticks = read_u64(v, "/pacing/max_ticks")?.filter(|n| *n > 0);

        let apply_to_ledger = read_bool(v, "/ledger/apply")?.unwrap_or(true);

        let export = ExportSettings {
            anomalies_path: read_str(v, "/export/anomalies_path")?
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            hash_chain: read_bool(v, "/export/hash_chain")?.unwrap_or(true),
        };

        Ok(ReplaySettings {
            source_path,
            source_format,
            window,
            pacing: PacingSettings { tick_ms, max_ticks },
            apply_to_ledger,
            export,
        })
    }

    /// Re-read the window section for a different mode (CLI override).
    pub fn with_mode(mut self, v: &Value, mode: ConfigMode) -> Result<Self> {
        self.window = window_for_mode(v, mode)?;
        Ok(self)
    }

    pub fn mode(&self) -> ConfigMode {
        self.window.mode()
    }
}

fn window_for_mode(v: &Value, mode: ConfigMode) -> Result<WindowSettings> {
    match mode {
        ConfigMode::Time => {
            let step_ms = read_u64(v, "/window/step_ms")?.unwrap_or(DEFAULT_STEP_MS);
            let initial_width_ms = read_u64(v, "/window/initial_width_ms")?.unwrap_or(step_ms);
            if step_ms == 0 {
                bail!("CONFIG_INVALID key=/window/step_ms: must be > 0");
            }
            if initial_width_ms == 0 {
                bail!("CONFIG_INVALID key=/window/initial_width_ms: must be > 0");
            }
            Ok(WindowSettings::Time {
                step_ms,
                initial_width_ms,
            })
        }
        ConfigMode::Count => {
            let size_rows = match read_u64(v, "/window/size_rows")? {
                Some(n) => usize::try_from(n)
                    .context("CONFIG_INVALID key=/window/size_rows: out of range")?,
                None => DEFAULT_SIZE_ROWS,
            };
            if size_rows == 0 {
                bail!("CONFIG_INVALID key=/window/size_rows: must be > 0");
            }
            Ok(WindowSettings::Count { size_rows })
        }
    }
}

fn read_str<'a>(v: &'a Value, ptr: &str) -> Result<Option<&'a str>> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => bail!("CONFIG_INVALID key={}: expected string, got {}", ptr, other),
    }
}

fn read_u64(v: &Value, ptr: &str) -> Result<Option<u64>> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(n) => match n.as_u64() {
            Some(x) => Ok(Some(x)),
            None => bail!(
                "CONFIG_INVALID key={}: expected a non-negative integer, got {}",
                ptr,
                n
            ),
        },
    }
}

fn read_bool(v: &Value, ptr: &str) -> Result<Option<bool>> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => bail!("CONFIG_INVALID key={}: expected bool, got {}", ptr, other),
    }
}
