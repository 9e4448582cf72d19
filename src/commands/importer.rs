// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::currencies::CurrencyKind;
use crate::models::{MARKETPLACES, MAX_QUANTITY, MIN_QUANTITY};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::path::Path;

pub const MAX_IMPORT_ROWS: usize = 500;
pub const MAX_FILE_SIZE: u64 = 1_000_000;

const REQUIRED_COLUMNS: [&str; 10] = [
    "gift name",
    "gift number",
    "quantity",
    "buy date",
    "sell date",
    "currency",
    "buy price",
    "sell price",
    "buy marketplace",
    "sell marketplace",
];

static GIFT_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub gift_name: String,
    pub gift_number: Option<String>,
    pub quantity: i64,
    pub buy_date: NaiveDate,
    pub sell_date: Option<NaiveDate>,
    pub currency: CurrencyKind,
    pub buy_price: i64,
    pub sell_price: Option<i64>,
    pub buy_marketplace: Option<String>,
    pub sell_marketplace: Option<String>,
}

#[derive(Debug)]
pub struct ParsedRow {
    /// 1-based data row number, not counting the header line.
    pub row_index: usize,
    pub data: Option<ImportRow>,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ParseReport {
    pub rows: Vec<ParsedRow>,
    pub valid_count: usize,
    pub error_count: usize,
    pub header_error: Option<String>,
}

/// Parse CSV text into per-row results. Broken rows never abort the run;
/// each collects its own error list so the report names every problem at
/// once. Only a bad header or the row cap stops parsing outright.
pub fn parse_trades_csv(content: &str) -> ParseReport {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            return ParseReport {
                header_error: Some(format!("Unreadable CSV header: {}", e)),
                ..ParseReport::default()
            };
        }
    };
    let mut columns: HashMap<String, usize> = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        columns.entry(h.trim().to_lowercase()).or_insert(i);
    }
    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return ParseReport {
                header_error: Some(format!("Missing required column: {}", required)),
                ..ParseReport::default()
            };
        }
    }

    let mut report = ParseReport::default();
    for (i, record) in reader.records().enumerate() {
        if i >= MAX_IMPORT_ROWS {
            report.header_error = Some(format!("CSV exceeds {} rows", MAX_IMPORT_ROWS));
            break;
        }
        let row_index = i + 1;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                report.error_count += 1;
                report.rows.push(ParsedRow {
                    row_index,
                    data: None,
                    errors: vec![format!("Unreadable row: {}", e)],
                });
                continue;
            }
        };
        let field = |name: &str| -> &str {
            columns
                .get(name)
                .and_then(|&idx| record.get(idx))
                .unwrap_or("")
                .trim()
        };
        let parsed = parse_row(
            field("gift name"),
            field("gift number"),
            field("quantity"),
            field("buy date"),
            field("sell date"),
            field("currency"),
            field("buy price"),
            field("sell price"),
            field("buy marketplace"),
            field("sell marketplace"),
        );
        match parsed {
            Ok(data) => {
                report.valid_count += 1;
                report.rows.push(ParsedRow {
                    row_index,
                    data: Some(data),
                    errors: Vec::new(),
                });
            }
            Err(errors) => {
                report.error_count += 1;
                report.rows.push(ParsedRow {
                    row_index,
                    data: None,
                    errors,
                });
            }
        }
    }
    report
}

#[allow(clippy::too_many_arguments)]
fn parse_row(
    gift_name: &str,
    gift_number: &str,
    quantity: &str,
    buy_date: &str,
    sell_date: &str,
    currency: &str,
    buy_price: &str,
    sell_price: &str,
    buy_marketplace: &str,
    sell_marketplace: &str,
) -> Result<ImportRow, Vec<String>> {
    let mut errors = Vec::new();

    if gift_name.is_empty() {
        errors.push("Gift Name is required".to_string());
    }

    let gift_number = if gift_number.is_empty() {
        None
    } else if GIFT_NUMBER_RE.is_match(gift_number) {
        Some(gift_number.to_string())
    } else {
        errors.push("Gift Number must be a positive integer".to_string());
        None
    };

    let quantity = if quantity.is_empty() {
        1
    } else {
        match quantity.parse::<i64>() {
            Ok(q) if (MIN_QUANTITY..=MAX_QUANTITY).contains(&q) => q,
            _ => {
                errors.push(format!("Quantity must be {}-{}", MIN_QUANTITY, MAX_QUANTITY));
                1
            }
        }
    };

    // A bad currency still lets price parsing proceed as Stars so the row
    // reports every problem it has, not just the first.
    let parsed_currency = match currency.to_uppercase().parse::<CurrencyKind>() {
        Ok(c) => c,
        Err(_) => {
            errors.push("Currency must be STARS or TON".to_string());
            CurrencyKind::Stars
        }
    };

    let buy_date = match NaiveDate::parse_from_str(buy_date, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            errors.push("Buy Date is invalid (use YYYY-MM-DD)".to_string());
            None
        }
    };
    let sell_date = if sell_date.is_empty() {
        None
    } else {
        match NaiveDate::parse_from_str(sell_date, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                errors.push("Sell Date is invalid (use YYYY-MM-DD)".to_string());
                None
            }
        }
    };

    let buy_price = match parsed_currency.parse_amount(buy_price) {
        Ok(p) => Some(p),
        Err(_) => {
            errors.push("Buy Price is invalid".to_string());
            None
        }
    };
    let sell_price = if sell_price.is_empty() {
        None
    } else {
        match parsed_currency.parse_amount(sell_price) {
            Ok(p) => Some(p),
            Err(_) => {
                errors.push("Sell Price is invalid".to_string());
                None
            }
        }
    };

    if sell_date.is_some() && sell_price.is_none() {
        errors.push("Sell Price required when Sell Date is set".to_string());
    }
    if sell_price.is_some() && sell_date.is_none() {
        errors.push("Sell Date required when Sell Price is set".to_string());
    }
    if let (Some(buy), Some(sell)) = (buy_date, sell_date)
        && sell < buy
    {
        errors.push("Sell Date cannot be before Buy Date".to_string());
    }

    let buy_marketplace = parse_marketplace(buy_marketplace, "Buy", &mut errors);
    let sell_marketplace = parse_marketplace(sell_marketplace, "Sell", &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }
    // Both are Some whenever the error list is empty.
    let (Some(buy_date), Some(buy_price)) = (buy_date, buy_price) else {
        return Err(errors);
    };
    Ok(ImportRow {
        gift_name: gift_name.to_string(),
        gift_number,
        quantity,
        buy_date,
        sell_date,
        currency: parsed_currency,
        buy_price,
        sell_price,
        buy_marketplace,
        sell_marketplace,
    })
}

fn parse_marketplace(raw: &str, side: &str, errors: &mut Vec<String>) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let mp = raw.to_lowercase();
    if MARKETPLACES.contains(&mp.as_str()) {
        Some(mp)
    } else {
        errors.push(format!("Invalid {} Marketplace: {}", side, raw));
        None
    }
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("trades", sub)) => import_trades(conn, sub),
        _ => Ok(()),
    }
}

fn import_trades(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = Path::new(sub.get_one::<String>("path").unwrap());
    let size = std::fs::metadata(path)
        .with_context(|| format!("Cannot read {}", path.display()))?
        .len();
    if size > MAX_FILE_SIZE {
        return Err(anyhow!(
            "{} is {} bytes, over the {} byte limit",
            path.display(),
            size,
            MAX_FILE_SIZE
        ));
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;

    let report = parse_trades_csv(&content);
    if let Some(err) = &report.header_error {
        return Err(anyhow!("{}", err));
    }

    let tx = conn.transaction()?;
    let mut inserted = 0usize;
    for row in report.rows.iter().filter_map(|r| r.data.as_ref()) {
        tx.execute(
            "INSERT INTO trades(gift_name, gift_number, quantity, buy_date, sell_date,
                                currency, buy_price, sell_price, commission_flat_stars,
                                commission_permille, buy_marketplace, sell_marketplace)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,0,0,?9,?10)",
            params![
                row.gift_name,
                row.gift_number,
                row.quantity,
                row.buy_date.to_string(),
                row.sell_date.map(|d| d.to_string()),
                row.currency.as_str(),
                row.buy_price,
                row.sell_price,
                row.buy_marketplace,
                row.sell_marketplace,
            ],
        )?;
        inserted += 1;
    }
    tx.commit()?;

    println!(
        "Imported {} trades, skipped {} rows",
        inserted, report.error_count
    );
    for row in report.rows.iter().filter(|r| !r.errors.is_empty()) {
        for err in &row.errors {
            eprintln!("Row {}: {}", row.row_index, err);
        }
    }
    Ok(())
}
