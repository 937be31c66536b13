//! JSON and CSV encodings of the same flow load to identical logs, and an
//! unsorted file comes back sorted with ties in input order.

use chrono::TimeDelta;
use ofr_eventlog::SourceFormat;
use ofr_schemas::MessageType;
use ofr_testkit::{write_csv_log, write_json_log, FlowBuilder};

#[test]
fn json_and_csv_round_trip_the_same_events() {
    use MessageType::*;
    let events = FlowBuilder::new()
        .spacing(TimeDelta::milliseconds(250))
        .symbol("BNS")
        .send_priced("10", NewOrderRequest, 55.25)
        .send_priced("10", NewOrderAcknowledged, 55.25)
        .symbol("CM")
        .send("11", NewOrderRequest)
        .send_priced("10", Trade, 55.2)
        .build();

    let dir = tempfile::tempdir().unwrap();
    let json = write_json_log(dir.path(), "orders.json", &events).unwrap();
    let csv = write_csv_log(dir.path(), "orders.csv", &events).unwrap();

    let from_json = ofr_eventlog::load_path(&json).unwrap();
    let from_csv = ofr_eventlog::load_path(&csv).unwrap();
    assert_eq!(from_json.events(), &events[..]);
    assert_eq!(from_csv.events(), from_json.events());
    assert_eq!(from_csv.symbols(), vec!["BNS", "CM"]);
    assert_eq!(from_csv.events()[2].order_price, None);
}

#[test]
fn unsorted_file_is_sorted_stably() {
    use MessageType::*;
    let mut events = FlowBuilder::new()
        .send("1", NewOrderRequest)
        .send("2", NewOrderRequest)
        .at(TimeDelta::seconds(1))
        .send("3", NewOrderRequest)
        .build();
    // Orders 2 and 3 share a timestamp; write the file back to front.
    events.reverse();

    let dir = tempfile::tempdir().unwrap();
    let path = write_csv_log(dir.path(), "orders.dat", &events).unwrap();
    let log = ofr_eventlog::load_path_as(&path, SourceFormat::Csv).unwrap();

    let ids: Vec<&str> = log.events().iter().map(|e| e.order_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3", "2"]);
}
