use anyhow::{Context, Result};
use ofr_ledger::AnomalyRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Namespace for deterministic `event_id`s.
const ENTRY_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f66_725f_616e_6f6d_616c_795f_6578_7074);

/// Append-only anomaly export. Writes JSON Lines, one anomaly per line.
/// Optional hash chain: each entry carries hash_prev + hash_self.
pub struct AnomalyWriter {
    path: PathBuf,
    hash_chain: bool,
    last_hash: Option<String>,
    /// Number of entries in the file; the next entry's `seq`.
    seq: u64,
}

impl AnomalyWriter {
    /// Creates the writer and ensures parent dirs exist. Existing content is
    /// kept; use [`resume`][AnomalyWriter::resume] to continue its chain.
    pub fn new(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }

        Ok(Self {
            path,
            hash_chain,
            last_hash: None,
            seq: 0,
        })
    }

    /// Open an existing export and continue after its last entry.
    pub fn resume(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let mut w = Self::new(path, hash_chain)?;
        if !w.path.exists() {
            return Ok(w);
        }

        let content =
            fs::read_to_string(&w.path).with_context(|| format!("read export {:?}", w.path))?;
        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let entry: AnomalyEntry = serde_json::from_str(trimmed)
                .with_context(|| format!("parse export entry at line {}", i + 1))?;
            w.seq = entry.seq + 1;
            w.last_hash = entry.hash_self;
        }
        Ok(w)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Append one anomaly.
    pub fn append(&mut self, record: &AnomalyRecord) -> Result<AnomalyEntry> {
        let record = serde_json::to_value(record).context("serialize anomaly record failed")?;
        let event_id = derive_event_id(self.last_hash.as_deref(), &record, self.seq)?;

        let mut entry = AnomalyEntry {
            seq: self.seq,
            event_id,
            record,
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            entry.hash_prev = self.last_hash.clone();
            let self_hash = compute_entry_hash(&entry)?;
            entry.hash_self = Some(self_hash.clone());
            self.last_hash = Some(self_hash);
        }

        let line = canonical_json_line(&entry)?;
        append_line(&self.path, &line)?;
        self.seq += 1;

        Ok(entry)
    }

    /// Append every record in order; returns how many were written.
    pub fn append_all<'a, I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a AnomalyRecord>,
    {
        let mut n = 0;
        for r in records {
            self.append(r)?;
            n += 1;
        }
        Ok(n)
    }
}

/// One exported line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEntry {
    pub seq: u64,
    pub event_id: Uuid,
    /// The serialized [`AnomalyRecord`].
    pub record: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// UUIDv5 over chain position, previous hash and record content. No RNG:
/// the same export always gets the same ids.
fn derive_event_id(prev_hash: Option<&str>, record: &Value, seq: u64) -> Result<Uuid> {
    let body = canonical_json_line(record)?;
    let name = format!("{}|{}|{}", seq, prev_hash.unwrap_or("-"), body);
    Ok(Uuid::new_v5(&ENTRY_ID_NAMESPACE, name.as_bytes()))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open export {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write export line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

/// Sort keys recursively and emit compact JSON.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize export entry failed")?;
    serde_json::to_string(&sort_keys(&raw)).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Hash of the canonical entry WITHOUT hash_self.
pub fn compute_entry_hash(entry: &AnomalyEntry) -> Result<String> {
    let mut clone = entry.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Verify the hash chain of an export file.
pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read export {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

/// Same as [`verify_hash_chain`] on in-memory JSONL content.
///
/// Checks, per line: `seq` is contiguous from 0, `hash_prev` equals the
/// previous `hash_self`, and `hash_self` (when present) matches the content.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let entry: AnomalyEntry = serde_json::from_str(trimmed)
            .with_context(|| format!("parse export entry at line {}", i + 1))?;

        if entry.seq != line_count as u64 {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!("seq gap: expected {}, got {}", line_count, entry.seq),
            });
        }
        line_count += 1;

        if entry.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, entry.hash_prev
                ),
            });
        }

        if let Some(ref claimed) = entry.hash_self {
            let recomputed = compute_entry_hash(&entry)?;
            if *claimed != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!(
                        "hash_self mismatch: claimed {}, recomputed {}",
                        claimed, recomputed
                    ),
                });
            }
        }

        prev_hash = entry.hash_self;
    }

    Ok(VerifyResult::Valid { lines: line_count })
}

/// Result of hash chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    /// First broken line (1-based).
    Broken { line: usize, reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid { .. })
    }
}
