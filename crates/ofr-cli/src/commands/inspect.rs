//! `ofr inspect`: log shape, palette and optional head rows.

use std::path::Path;

use anyhow::Result;
use ofr_replay::Palette;
use ofr_schemas::{Direction, OrderEvent};

pub fn run_inspect(source: &Path, format: Option<&str>, head: usize) -> Result<()> {
    let log = super::load_log(source, format)?;

    println!("source={}", source.display());
    println!("rows={}", log.len());
    if let (Some(first), Some(last)) = (log.first_timestamp(), log.last_timestamp()) {
        println!("first_ts={}", first.to_rfc3339());
        println!("last_ts={}", last.to_rfc3339());
        println!("span_ms={}", (last - first).num_milliseconds());
    }

    let symbols = Palette::assign(log.symbols());
    for (symbol, color) in symbols.entries() {
        println!("symbol={} color={}", symbol, color);
    }

    let types = Palette::assign(log.message_types().iter().map(|m| m.as_str()));
    for (message_type, color) in types.entries() {
        println!("message_type={} color={}", message_type, color);
    }

    for d in [Direction::NbfToExchange, Direction::ExchangeToNbf] {
        println!("direction={} bar_color={}", d, d.bar_color());
    }

    for (row, ev) in log.events().iter().take(head).enumerate() {
        println!("{}", row_line(row, ev));
    }

    Ok(())
}

fn row_line(row: usize, ev: &OrderEvent) -> String {
    let price = ev
        .signed_price()
        .map_or_else(|| "-".to_string(), |p| format!("{:.4}", p));
    format!(
        "row={} ts={} order_id={} message_type={} symbol={} direction={} signed_price={}",
        row,
        ev.timestamp.to_rfc3339(),
        ev.order_id,
        ev.message_type,
        ev.symbol,
        ev.direction,
        price
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ofr_schemas::MessageType;

    #[test]
    fn row_line_shows_signed_price() {
        let ev = OrderEvent::new(
            "42",
            MessageType::NewOrderRequest,
            Utc.timestamp_opt(0, 0).unwrap(),
            "RY",
            Direction::NbfToExchange,
        )
        .with_price(101.5);
        let line = row_line(3, &ev);
        assert!(line.contains("row=3"));
        assert!(line.contains("order_id=42"));
        assert!(line.contains("signed_price=-101.5000"));
    }
}
