//! Order-flow feed loader (deterministic).
//!
//! Required fields:
//! - `OrderID` (string or integer)
//! - `MessageType` (one of the six literal lifecycle names)
//! - `TimeStamp` (`Timestamp` accepted as an alias)
//! - `Symbol`
//! - `Direction` (`NBFToExchange` | `ExchangeToNBF`)
//!
//! Optional fields:
//! - `OrderPrice` (number; `null`, absent, empty or `NaN` => no price)
//!
//! JSON input is either an array of records or the column-oriented object
//! pandas writes by default (`{"OrderID": {"0": 1, ...}, ...}`).

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use ofr_schemas::{Direction, MessageType, OrderEvent, OrderId};
use serde_json::{Map, Value};
use tracing::debug;

use crate::log::EventLog;

const TIMESTAMP_FIELDS: &[&str] = &["TimeStamp", "Timestamp"];

/// Loader errors are small, explicit, and test-friendly.
///
/// `record` is the 0-based position of the record in the source, before sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedInputError {
    EmptyInput,
    MissingField { record: usize, field: &'static str },
    BadTimestamp { record: usize, value: String },
    BadValue { record: usize, field: &'static str, value: String },
    Json(String),
    Csv(String),
    Io(String),
    UnsupportedFormat(String),
}

impl From<std::io::Error> for MalformedInputError {
    fn from(e: std::io::Error) -> Self {
        MalformedInputError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for MalformedInputError {
    fn from(e: serde_json::Error) -> Self {
        MalformedInputError::Json(e.to_string())
    }
}

impl From<csv::Error> for MalformedInputError {
    fn from(e: csv::Error) -> Self {
        MalformedInputError::Csv(e.to_string())
    }
}

impl std::fmt::Display for MalformedInputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedInputError::EmptyInput => write!(f, "empty input"),
            MalformedInputError::MissingField { record, field } => {
                write!(f, "record {}: missing required field {}", record, field)
            }
            MalformedInputError::BadTimestamp { record, value } => {
                write!(f, "record {}: unparsable timestamp '{}'", record, value)
            }
            MalformedInputError::BadValue {
                record,
                field,
                value,
            } => write!(f, "record {}: invalid {} '{}'", record, field, value),
            MalformedInputError::Json(e) => write!(f, "json error: {}", e),
            MalformedInputError::Csv(e) => write!(f, "csv error: {}", e),
            MalformedInputError::Io(e) => write!(f, "io error: {}", e),
            MalformedInputError::UnsupportedFormat(ext) => {
                write!(f, "unsupported source format: '{}' (expected json | csv)", ext)
            }
        }
    }
}

impl std::error::Error for MalformedInputError {}

/// On-disk encodings the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Csv,
}

impl SourceFormat {
    pub fn parse(s: &str) -> Result<Self, MalformedInputError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(SourceFormat::Json),
            "csv" => Ok(SourceFormat::Csv),
            other => Err(MalformedInputError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Infer the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, MalformedInputError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::parse(ext)
    }
}

/// Load a log from disk, inferring the format from the extension.
pub fn load_path(path: impl AsRef<Path>) -> Result<EventLog, MalformedInputError> {
    let path = path.as_ref();
    let format = SourceFormat::from_path(path)?;
    load_path_as(path, format)
}

/// Load a log from disk with an explicit format.
pub fn load_path_as(
    path: impl AsRef<Path>,
    format: SourceFormat,
) -> Result<EventLog, MalformedInputError> {
    let raw = fs::read_to_string(path.as_ref())?;
    // Strip UTF-8 BOM if present.
    let raw = raw.trim_start_matches('\u{feff}');
    match format {
        SourceFormat::Json => load_json_str(raw),
        SourceFormat::Csv => load_csv_str(raw),
    }
}

/// Parse a JSON document (pure, deterministic).
pub fn load_json_str(json: &str) -> Result<EventLog, MalformedInputError> {
    if json.trim().is_empty() {
        return Err(MalformedInputError::EmptyInput);
    }
    let doc: Value = serde_json::from_str(json)?;
    let records = match doc {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(MalformedInputError::BadValue {
                    record: i,
                    field: "record",
                    value: other.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Value::Object(columns) => pivot_columns(columns)?,
        other => {
            return Err(MalformedInputError::Json(format!(
                "expected an array of records or an object of columns, got {}",
                other
            )))
        }
    };
    build_log(records)
}

/// Parse CSV content with a header row (pure, deterministic).
pub fn load_csv_str(csv_text: &str) -> Result<EventLog, MalformedInputError> {
    if csv_text.trim().is_empty() {
        return Err(MalformedInputError::EmptyInput);
    }
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());
    let headers = rdr.headers()?.clone();

    let mut records = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let mut map = Map::new();
        for (h, v) in headers.iter().zip(rec.iter()) {
            let value = if v.is_empty() {
                Value::Null
            } else {
                Value::String(v.to_string())
            };
            map.insert(h.to_string(), value);
        }
        records.push(map);
    }
    build_log(records)
}

/// Turn pandas' column-oriented layout into row records ordered by row label.
fn pivot_columns(columns: Map<String, Value>) -> Result<Vec<Map<String, Value>>, MalformedInputError> {
    let mut rows: Vec<(u64, Map<String, Value>)> = Vec::new();
    for (column, cells) in columns {
        let Value::Object(cells) = cells else {
            return Err(MalformedInputError::Json(format!(
                "column '{}' is not an object of cells",
                column
            )));
        };
        for (label, cell) in cells {
            let key: u64 = label.parse().map_err(|_| {
                MalformedInputError::Json(format!("row label '{}' is not an integer", label))
            })?;
            let pos = match rows.binary_search_by_key(&key, |(k, _)| *k) {
                Ok(pos) => pos,
                Err(pos) => {
                    rows.insert(pos, (key, Map::new()));
                    pos
                }
            };
            rows[pos].1.insert(column.clone(), cell);
        }
    }
    Ok(rows.into_iter().map(|(_, m)| m).collect())
}

fn build_log(records: Vec<Map<String, Value>>) -> Result<EventLog, MalformedInputError> {
    if records.is_empty() {
        return Err(MalformedInputError::EmptyInput);
    }
    let events = records
        .iter()
        .enumerate()
        .map(|(i, r)| parse_record(i, r))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(records = events.len(), "event log parsed");
    Ok(EventLog::from_events(events))
}

fn parse_record(record: usize, r: &Map<String, Value>) -> Result<OrderEvent, MalformedInputError> {
    let order_id_raw = required(r, record, "OrderID")?;
    let order_id: OrderId =
        serde_json::from_value(order_id_raw.clone()).map_err(|_| MalformedInputError::BadValue {
            record,
            field: "OrderID",
            value: render(order_id_raw),
        })?;

    let message_type_raw = required(r, record, "MessageType")?;
    let message_type: MessageType =
        text(message_type_raw)
            .parse()
            .map_err(|_| MalformedInputError::BadValue {
                record,
                field: "MessageType",
                value: render(message_type_raw),
            })?;

    let ts_raw = TIMESTAMP_FIELDS
        .iter()
        .find_map(|f| r.get(*f).filter(|v| !v.is_null()))
        .ok_or(MalformedInputError::MissingField {
            record,
            field: "TimeStamp",
        })?;
    let timestamp = timestamp_value(ts_raw).ok_or_else(|| MalformedInputError::BadTimestamp {
        record,
        value: render(ts_raw),
    })?;

    let symbol = text(required(r, record, "Symbol")?).trim().to_string();
    if symbol.is_empty() {
        return Err(MalformedInputError::MissingField {
            record,
            field: "Symbol",
        });
    }

    let direction_raw = required(r, record, "Direction")?;
    let direction: Direction =
        text(direction_raw)
            .parse()
            .map_err(|_| MalformedInputError::BadValue {
                record,
                field: "Direction",
                value: render(direction_raw),
            })?;

    let order_price = match r.get("OrderPrice") {
        None | Some(Value::Null) => None,
        Some(v) => price_value(v).ok_or_else(|| MalformedInputError::BadValue {
            record,
            field: "OrderPrice",
            value: render(v),
        })?,
    };

    Ok(OrderEvent {
        order_id,
        message_type,
        timestamp,
        symbol,
        order_price,
        direction,
    })
}

fn required<'a>(
    r: &'a Map<String, Value>,
    record: usize,
    field: &'static str,
) -> Result<&'a Value, MalformedInputError> {
    r.get(field)
        .filter(|v| !v.is_null())
        .ok_or(MalformedInputError::MissingField { record, field })
}

/// String content of a scalar; numbers render as their JSON text.
fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render(v: &Value) -> String {
    text(v).chars().take(64).collect()
}

/// `Ok(None)` means "no price" (NaN/empty), `None` means unparsable.
fn price_value(v: &Value) -> Option<Option<f64>> {
    match v {
        Value::Number(n) => n.as_f64().map(Some),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() || t.eq_ignore_ascii_case("nan") {
                Some(None)
            } else {
                t.parse::<f64>().ok().filter(|p| p.is_finite()).map(Some)
            }
        }
        _ => None,
    }
}

fn timestamp_value(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::String(s) => parse_timestamp(s),
        _ => None,
    }
}

/// Parse the timestamp spellings found in order-flow feeds.
///
/// Accepted: RFC 3339, naive `YYYY-MM-DD[ T]HH:MM:SS[.fff]` (read as UTC),
/// or integer epoch milliseconds.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(ms) = t.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp_millis(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(t, fmt).ok())
        .map(|naive| naive.and_utc())
}
