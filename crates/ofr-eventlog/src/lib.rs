//! ofr-eventlog
//!
//! Loads the order-flow feed once at startup and exposes it as an immutable,
//! timestamp-sorted, row-indexed sequence.
//!
//! - Unsorted input is accepted and corrected (stable sort; ties keep input order).
//! - Malformed records abort loading; nothing is silently dropped.
//! - The on-disk format is a loader concern: JSON (records or pandas columns) and CSV.

mod loader;
mod log;

pub use loader::{
    load_csv_str, load_json_str, load_path, load_path_as, parse_timestamp, MalformedInputError,
    SourceFormat,
};
pub use log::EventLog;
