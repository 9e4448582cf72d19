// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rust_decimal::Decimal;

const UA: &str = concat!(
    "giftfolio/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/giftfolio)"
);

pub fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Validate a locked USD rate string: a positive decimal, stored verbatim.
pub fn parse_rate(s: &str) -> Result<String> {
    let trimmed = s.trim();
    let d = Decimal::from_str_exact(trimmed)
        .with_context(|| format!("Invalid rate '{}'", s))?;
    if d <= Decimal::ZERO {
        anyhow::bail!("Rate '{}' must be positive", s);
    }
    Ok(trimmed.to_string())
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

/// "$12.34" — dot decimal, dollar sign prefix.
pub fn format_usd(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", -amount)
    } else {
        format!("${:.2}", amount)
    }
}

/// "+12.5%" or "-3.2%".
pub fn format_percent(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{}{:.1}%", sign, value)
}

/// DD.MM.YY display form.
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%d.%m.%y").to_string()
}

/// Render an optional cell; absent data is a dash, never a fake zero.
pub fn dash<T, F: FnOnce(T) -> String>(value: Option<T>, f: F) -> String {
    value.map(f).unwrap_or_else(|| "—".to_string())
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
