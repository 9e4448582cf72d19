// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::trades::{TradeFilter, load_trades};
use crate::models::Trade;
use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

// Column set mirrors the import format, so an export feeds back in unchanged.
const EXPORT_HEADERS: [&str; 10] = [
    "Gift Name",
    "Gift Number",
    "Quantity",
    "Buy Date",
    "Sell Date",
    "Currency",
    "Buy Price",
    "Sell Price",
    "Buy Marketplace",
    "Sell Marketplace",
];

#[derive(Serialize)]
struct ExportRow {
    gift_name: String,
    gift_number: Option<String>,
    quantity: i64,
    buy_date: String,
    sell_date: Option<String>,
    currency: String,
    buy_price: String,
    sell_price: Option<String>,
    buy_marketplace: Option<String>,
    sell_marketplace: Option<String>,
}

fn export_row(t: &Trade) -> ExportRow {
    ExportRow {
        gift_name: t.gift_name.clone(),
        gift_number: t.gift_number.clone(),
        quantity: t.quantity,
        buy_date: t.buy_date.to_string(),
        sell_date: t.sell_date.map(|d| d.to_string()),
        currency: t.currency.as_str().to_string(),
        buy_price: t.currency.raw_amount(t.buy_price),
        sell_price: t.sell_price.map(|p| t.currency.raw_amount(p)),
        buy_marketplace: t.buy_marketplace.clone(),
        sell_marketplace: t.sell_marketplace.clone(),
    }
}

pub fn write_csv<W: std::io::Write>(trades: &[Trade], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(EXPORT_HEADERS)?;
    for t in trades {
        let r = export_row(t);
        let quantity = r.quantity.to_string();
        writer.write_record([
            r.gift_name.as_str(),
            r.gift_number.as_deref().unwrap_or(""),
            quantity.as_str(),
            r.buy_date.as_str(),
            r.sell_date.as_deref().unwrap_or(""),
            r.currency.as_str(),
            r.buy_price.as_str(),
            r.sell_price.as_deref().unwrap_or(""),
            r.buy_marketplace.as_deref().unwrap_or(""),
            r.sell_marketplace.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: std::io::Write>(trades: &[Trade], out: W) -> Result<()> {
    let rows: Vec<ExportRow> = trades.iter().map(export_row).collect();
    serde_json::to_writer_pretty(out, &rows)?;
    Ok(())
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("trades", sub)) => export_trades(conn, sub),
        _ => Ok(()),
    }
}

fn export_trades(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let format = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out_path = Path::new(sub.get_one::<String>("out").unwrap());
    let trades = load_trades(conn, &TradeFilter::default())?;

    let file = std::fs::File::create(out_path)
        .with_context(|| format!("Cannot create {}", out_path.display()))?;
    match format.as_str() {
        "csv" => write_csv(&trades, file)?,
        "json" => write_json(&trades, file)?,
        other => return Err(anyhow!("Unknown format '{}' (use csv|json)", other)),
    }
    println!("Exported {} trades to {}", trades.len(), out_path.display());
    Ok(())
}
