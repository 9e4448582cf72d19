// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use giftfolio::cli::build_cli;
use giftfolio::commands::trades::{TradeFilter, load_trades};
use giftfolio::commands::{exporter, importer};
use giftfolio::currencies::CurrencyKind;
use giftfolio::db;
use rusqlite::Connection;
use std::io::Write;

fn test_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn run_import(conn: &mut Connection, path: &str) -> anyhow::Result<()> {
    let matches =
        build_cli().get_matches_from(["giftfolio", "import", "trades", "--path", path]);
    let (_, sub) = matches.subcommand().unwrap();
    importer::handle(conn, sub)
}

fn run_export(conn: &Connection, format: &str, path: &str) -> anyhow::Result<()> {
    let matches = build_cli().get_matches_from([
        "giftfolio", "export", "trades", "--format", format, "--out", path,
    ]);
    let (_, sub) = matches.subcommand().unwrap();
    exporter::handle(conn, sub)
}

fn csv_file(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

const HEADER: &str = "Gift Name,Gift Number,Quantity,Buy Date,Sell Date,Currency,Buy Price,Sell Price,Buy Marketplace,Sell Marketplace";

#[test]
fn import_inserts_valid_rows() {
    let mut conn = test_conn();
    let f = csv_file(&format!(
        "{}\nPlush Pepe,7,2,2025-01-01,2025-01-10,STARS,100,150,fragment,getgems\nDurov's Cap,,,2025-02-01,,TON,3.5,,,\n",
        HEADER
    ));
    run_import(&mut conn, f.path().to_str().unwrap()).unwrap();

    let trades = load_trades(&conn, &TradeFilter::default()).unwrap();
    assert_eq!(trades.len(), 2);

    let cap = trades.iter().find(|t| t.gift_name == "Durov's Cap").unwrap();
    assert_eq!(cap.currency, CurrencyKind::Ton);
    assert_eq!(cap.buy_price, 3_500_000_000);
    assert!(cap.is_open());

    let pepe = trades.iter().find(|t| t.gift_name == "Plush Pepe").unwrap();
    assert_eq!(pepe.gift_number.as_deref(), Some("7"));
    assert_eq!(pepe.quantity, 2);
    assert_eq!(pepe.sell_price, Some(150));
}

#[test]
fn import_skips_broken_rows_but_keeps_good_ones() {
    let mut conn = test_conn();
    let f = csv_file(&format!(
        "{}\n,,,bad,,STARS,x,,,\nPepe,,,2025-01-01,,STARS,100,,,\n",
        HEADER
    ));
    run_import(&mut conn, f.path().to_str().unwrap()).unwrap();

    let trades = load_trades(&conn, &TradeFilter::default()).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].gift_name, "Pepe");
}

#[test]
fn import_fails_on_missing_column() {
    let mut conn = test_conn();
    let f = csv_file("Gift Name,Quantity\nPepe,1\n");
    let err = run_import(&mut conn, f.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Missing required column"));
    assert!(load_trades(&conn, &TradeFilter::default()).unwrap().is_empty());
}

#[test]
fn import_fails_on_oversized_file() {
    let mut conn = test_conn();
    let mut content = String::from(HEADER);
    content.push('\n');
    let filler = "x".repeat(1000);
    while content.len() <= importer::MAX_FILE_SIZE as usize {
        content.push_str(&filler);
        content.push('\n');
    }
    let f = csv_file(&content);
    let err = run_import(&mut conn, f.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("byte limit"));
}

#[test]
fn export_csv_round_trips_into_fresh_db() {
    let mut conn = test_conn();
    let f = csv_file(&format!(
        "{}\nPlush Pepe,7,2,2025-01-01,2025-01-10,STARS,100,150,fragment,getgems\nDurov's Cap,,,2025-02-01,,TON,3.5,,,\n",
        HEADER
    ));
    run_import(&mut conn, f.path().to_str().unwrap()).unwrap();

    let out = tempfile::NamedTempFile::new().unwrap();
    run_export(&conn, "csv", out.path().to_str().unwrap()).unwrap();

    let mut fresh = test_conn();
    run_import(&mut fresh, out.path().to_str().unwrap()).unwrap();
    let trades = load_trades(&fresh, &TradeFilter::default()).unwrap();
    assert_eq!(trades.len(), 2);
    let cap = trades.iter().find(|t| t.gift_name == "Durov's Cap").unwrap();
    assert_eq!(cap.buy_price, 3_500_000_000);
}

#[test]
fn export_json_writes_raw_amounts() {
    let mut conn = test_conn();
    let f = csv_file(&format!("{}\nCap,,,2025-02-01,,TON,3.5,,,\n", HEADER));
    run_import(&mut conn, f.path().to_str().unwrap()).unwrap();

    let out = tempfile::NamedTempFile::new().unwrap();
    run_export(&conn, "json", out.path().to_str().unwrap()).unwrap();

    let text = std::fs::read_to_string(out.path()).unwrap();
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v[0]["buy_price"], "3.5");
    assert_eq!(v[0]["currency"], "TON");
}

#[test]
fn export_rejects_unknown_format() {
    let conn = test_conn();
    let out = tempfile::NamedTempFile::new().unwrap();
    let err = run_export(&conn, "xml", out.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Unknown format"));
}
