//! Loading order logs from files.
//!
//! GREEN when:
//! - The extension picks the parser, case-insensitively.
//! - A leading UTF-8 BOM (as written by spreadsheet exports) is ignored.
//! - Missing files and unknown extensions fail with typed errors.

use std::fs;

use ofr_eventlog::{load_path, load_path_as, MalformedInputError, SourceFormat};
use ofr_schemas::MessageType;

const CSV_BODY: &str = "OrderID,MessageType,TimeStamp,Symbol,OrderPrice,Direction\n\
    7,NewOrderAcknowledged,2024-01-02 09:30:01,RY,101.5,ExchangeToNBF\n\
    7,NewOrderRequest,2024-01-02 09:30:00,RY,101.5,NBFToExchange\n";

#[test]
fn csv_with_bom_loads_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flow.CSV");
    fs::write(&path, format!("\u{feff}{}", CSV_BODY)).unwrap();

    let log = load_path(&path).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log.events()[0].message_type, MessageType::NewOrderRequest);
    assert_eq!(log.events()[0].order_id.as_str(), "7");
    assert_eq!(log.events()[1].order_price, Some(101.5));
}

#[test]
fn json_extension_selects_json_parser() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flow.json");
    fs::write(
        &path,
        "\u{feff}[{\"OrderID\": 3, \"MessageType\": \"NewOrderRequest\", \
         \"TimeStamp\": 1704205800000, \"Symbol\": \"TD\", \"Direction\": \"NBFToExchange\"}]",
    )
    .unwrap();

    let log = load_path(&path).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log.events()[0].symbol, "TD");
    assert_eq!(log.events()[0].order_price, None);
}

#[test]
fn explicit_format_overrides_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flow.txt");
    fs::write(&path, CSV_BODY).unwrap();

    assert!(matches!(
        load_path(&path),
        Err(MalformedInputError::UnsupportedFormat(_))
    ));
    assert_eq!(load_path_as(&path, SourceFormat::Csv).unwrap().len(), 2);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_path(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, MalformedInputError::Io(_)), "{err}");
}
