// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::currencies::{CurrencyKind, STARS_USD_RATE};
use crate::market::Market;
use crate::models::{MARKETPLACES, MAX_PERMILLE, MAX_QUANTITY, MIN_QUANTITY, Trade};
use crate::pnl::{calculate_profit, calculate_unrealized_pnl};
use crate::utils::{dash, format_percent, format_usd, maybe_print_json, parse_date, parse_rate};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::collections::HashMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("sell", sub)) => sell(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("value", sub)) => value(conn, sub)?,
        Some(("delete", sub)) => delete(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn validate_marketplace(raw: &str) -> Result<String> {
    let mp = raw.trim().to_lowercase();
    if MARKETPLACES.contains(&mp.as_str()) {
        Ok(mp)
    } else {
        Err(anyhow!(
            "Unknown marketplace '{}' (use {})",
            raw,
            MARKETPLACES.join("|")
        ))
    }
}

/// Resolve the USD rate to lock for an event happening now: an explicit
/// override wins, Stars are fixed by Telegram, TON needs a live fetch.
fn locked_rate(
    currency: CurrencyKind,
    rate_flag: Option<&str>,
    live: bool,
) -> Result<Option<String>> {
    if let Some(raw) = rate_flag {
        return Ok(Some(parse_rate(raw)?));
    }
    match currency {
        CurrencyKind::Stars => Ok(Some(STARS_USD_RATE.to_string())),
        CurrencyKind::Ton => {
            if !live {
                return Ok(None);
            }
            match Market::new()?.ton_usd_rate() {
                Some(rate) => Ok(Some(rate.to_string())),
                None => {
                    eprintln!("Warning: TON/USD rate unavailable; storing no locked rate");
                    Ok(None)
                }
            }
        }
    }
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    if name.is_empty() {
        return Err(anyhow!("Gift name must not be empty"));
    }
    let currency: CurrencyKind = sub
        .get_one::<String>("currency")
        .unwrap()
        .parse()
        .map_err(|_| anyhow!("Currency must be STARS or TON"))?;
    let price_raw = sub.get_one::<String>("price").unwrap();
    let buy_price = currency
        .parse_amount(price_raw)
        .with_context(|| format!("Invalid buy price '{}'", price_raw))?;
    let buy_date = parse_date(sub.get_one::<String>("date").unwrap())?;

    let quantity = match sub.get_one::<String>("quantity") {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|q| (MIN_QUANTITY..=MAX_QUANTITY).contains(q))
            .ok_or_else(|| anyhow!("Quantity must be {}-{}", MIN_QUANTITY, MAX_QUANTITY))?,
        None => 1,
    };

    let gift_number = match sub.get_one::<String>("number") {
        Some(raw) => {
            let n = raw.trim();
            if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
                return Err(anyhow!("Gift number must be a positive integer"));
            }
            Some(n.to_string())
        }
        None => None,
    };

    let flat = match sub.get_one::<String>("flat") {
        Some(raw) => crate::currencies::Stars::parse(raw)
            .map(|s| s.0)
            .map_err(|e| anyhow!("Invalid flat commission: {}", e))?,
        None => 0,
    };
    if currency == CurrencyKind::Ton && flat != 0 {
        return Err(anyhow!(
            "Flat commission is Stars-denominated and cannot be set on a TON trade"
        ));
    }

    let permille = match sub.get_one::<String>("permille") {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|p| (0..=MAX_PERMILLE).contains(p))
            .ok_or_else(|| anyhow!("Permille must be 0-{}", MAX_PERMILLE))?,
        None => 0,
    };

    let marketplace = sub
        .get_one::<String>("marketplace")
        .map(|s| validate_marketplace(s))
        .transpose()?;
    let note = sub.get_one::<String>("note").map(|s| s.trim().to_string());
    let buy_rate = locked_rate(
        currency,
        sub.get_one::<String>("rate").map(|s| s.as_str()),
        sub.get_flag("live"),
    )?;

    conn.execute(
        "INSERT INTO trades(gift_name, gift_number, quantity, buy_date, currency, buy_price,
                            commission_flat_stars, commission_permille, buy_rate_usd,
                            buy_marketplace, note)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            name,
            gift_number,
            quantity,
            buy_date.to_string(),
            currency.as_str(),
            buy_price,
            flat,
            permille,
            buy_rate,
            marketplace,
            note
        ],
    )?;
    println!(
        "Recorded buy {} x {} @ {} on {}",
        quantity,
        name,
        currency.format_amount(buy_price),
        buy_date
    );
    Ok(())
}

fn sell(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let row: Option<(String, String, Option<i64>)> = conn
        .query_row(
            "SELECT currency, buy_date, sell_price FROM trades WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    let (currency_s, buy_date_s, sell_price) =
        row.ok_or_else(|| anyhow!("Trade {} not found", id))?;
    if sell_price.is_some() {
        return Err(anyhow!("Trade {} is already closed", id));
    }
    let currency: CurrencyKind = currency_s
        .parse()
        .map_err(|_| anyhow!("Trade {} has corrupt currency '{}'", id, currency_s))?;
    let buy_date = parse_date(&buy_date_s)?;

    let price_raw = sub.get_one::<String>("price").unwrap();
    let sell_price = currency
        .parse_amount(price_raw)
        .with_context(|| format!("Invalid sell price '{}'", price_raw))?;
    let sell_date = parse_date(sub.get_one::<String>("date").unwrap())?;
    if sell_date < buy_date {
        return Err(anyhow!(
            "Sell date {} cannot be before buy date {}",
            sell_date,
            buy_date
        ));
    }
    let marketplace = sub
        .get_one::<String>("marketplace")
        .map(|s| validate_marketplace(s))
        .transpose()?;
    let sell_rate = locked_rate(
        currency,
        sub.get_one::<String>("rate").map(|s| s.as_str()),
        sub.get_flag("live"),
    )?;

    conn.execute(
        "UPDATE trades SET sell_price=?1, sell_date=?2, sell_rate_usd=?3, sell_marketplace=?4
         WHERE id=?5",
        params![
            sell_price,
            sell_date.to_string(),
            sell_rate,
            marketplace,
            id
        ],
    )?;
    println!(
        "Closed trade {} @ {} on {}",
        id,
        currency.format_amount(sell_price),
        sell_date
    );
    Ok(())
}

fn delete(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let n = conn.execute("DELETE FROM trades WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(anyhow!("Trade {} not found", id));
    }
    println!("Deleted trade {}", id);
    Ok(())
}

#[derive(Debug, Default)]
pub struct TradeFilter {
    pub open_only: bool,
    pub closed_only: bool,
    pub currency: Option<CurrencyKind>,
    pub limit: Option<usize>,
}

pub fn load_trades(conn: &Connection, filter: &TradeFilter) -> Result<Vec<Trade>> {
    let mut sql = String::from(
        "SELECT id, gift_name, gift_number, quantity, buy_date, sell_date, currency,
                buy_price, sell_price, commission_flat_stars, commission_permille,
                buy_rate_usd, sell_rate_usd, buy_marketplace, sell_marketplace, note
         FROM trades WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if filter.open_only {
        sql.push_str(" AND sell_price IS NULL");
    }
    if filter.closed_only {
        sql.push_str(" AND sell_price IS NOT NULL");
    }
    if let Some(ccy) = filter.currency {
        sql.push_str(" AND currency=?");
        params_vec.push(ccy.as_str().into());
    }
    sql.push_str(" ORDER BY buy_date DESC, id DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let rows = stmt.query_map(rusqlite::params_from_iter(params), trade_from_row)?;
    let mut trades = Vec::new();
    for row in rows {
        trades.push(row?);
    }
    Ok(trades)
}

fn trade_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Trade> {
    let currency_s: String = r.get(6)?;
    let currency = currency_s.parse::<CurrencyKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Trade {
        id: r.get(0)?,
        gift_name: r.get(1)?,
        gift_number: r.get(2)?,
        quantity: r.get(3)?,
        buy_date: r.get::<_, NaiveDate>(4)?,
        sell_date: r.get::<_, Option<NaiveDate>>(5)?,
        currency,
        buy_price: r.get(7)?,
        sell_price: r.get(8)?,
        commission_flat_stars: r.get(9)?,
        commission_permille: r.get(10)?,
        buy_rate_usd: r.get(11)?,
        sell_rate_usd: r.get(12)?,
        buy_marketplace: r.get(13)?,
        sell_marketplace: r.get(14)?,
        note: r.get(15)?,
    })
}

#[derive(Serialize)]
struct TradeRow {
    id: i64,
    gift: String,
    quantity: i64,
    currency: String,
    buy_price: String,
    sell_price: Option<String>,
    net_profit: Option<String>,
    profit_percent: Option<f64>,
    net_profit_usd: Option<f64>,
    status: &'static str,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let filter = TradeFilter {
        open_only: sub.get_flag("open"),
        closed_only: sub.get_flag("closed"),
        currency: sub
            .get_one::<String>("currency")
            .map(|s| {
                s.parse::<CurrencyKind>()
                    .map_err(|_| anyhow!("Currency must be STARS or TON"))
            })
            .transpose()?,
        limit: sub.get_one::<usize>("limit").copied(),
    };
    let trades = load_trades(conn, &filter)?;

    let data: Vec<TradeRow> = trades
        .iter()
        .map(|t| {
            let result = calculate_profit(&t.profit_input());
            TradeRow {
                id: t.id,
                gift: t.gift_name.clone(),
                quantity: t.quantity,
                currency: t.currency.as_str().to_string(),
                buy_price: t.currency.raw_amount(t.buy_price),
                sell_price: t.sell_price.map(|p| t.currency.raw_amount(p)),
                net_profit: result.net_profit.map(|p| t.currency.raw_amount(p)),
                profit_percent: result.profit_percent,
                net_profit_usd: result.net_profit_usd,
                status: if t.is_open() { "open" } else { "closed" },
            }
        })
        .collect();

    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = trades
            .iter()
            .map(|t| {
                let result = calculate_profit(&t.profit_input());
                vec![
                    t.id.to_string(),
                    crate::utils::format_display_date(t.buy_date),
                    t.gift_name.clone(),
                    t.quantity.to_string(),
                    t.currency.format_amount(t.buy_price),
                    dash(t.sell_price, |p| t.currency.format_amount(p)),
                    dash(result.net_profit, |p| t.currency.format_amount(p)),
                    dash(result.profit_percent, format_percent),
                    dash(result.net_profit_usd, format_usd),
                ]
            })
            .collect();
        println!(
            "{}",
            crate::utils::pretty_table(
                &["ID", "Date", "Gift", "Qty", "Buy", "Sell", "Net", "%", "Net USD"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct UnrealizedRow {
    pub id: i64,
    pub gift: String,
    pub quantity: i64,
    pub currency: String,
    pub buy_price: String,
    pub floor_price: i64,
    pub unrealized_pnl: Option<i64>,
    pub unrealized_percent: Option<f64>,
}

/// Join open positions against a floor-price map keyed by collection name.
/// A manual override floor applies to every row when given.
pub fn unrealized_rows(
    trades: &[Trade],
    floors: &HashMap<String, f64>,
    override_floor: Option<f64>,
) -> Vec<UnrealizedRow> {
    trades
        .iter()
        .filter(|t| t.is_open())
        .map(|t| {
            let floor = override_floor
                .or_else(|| floors.get(&t.gift_name).copied())
                .unwrap_or(0.0);
            let u = calculate_unrealized_pnl(
                t.buy_price,
                t.currency,
                floor,
                t.commission_flat_stars,
                t.commission_permille,
                t.quantity,
            );
            UnrealizedRow {
                id: t.id,
                gift: t.gift_name.clone(),
                quantity: t.quantity,
                currency: t.currency.as_str().to_string(),
                buy_price: t.currency.raw_amount(t.buy_price),
                floor_price: u.floor_price,
                unrealized_pnl: u.unrealized_pnl,
                unrealized_percent: u.unrealized_percent,
            }
        })
        .collect()
}

fn value(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let trades = load_trades(
        conn,
        &TradeFilter {
            open_only: true,
            ..TradeFilter::default()
        },
    )?;

    let override_floor = sub
        .get_one::<String>("floor")
        .map(|raw| {
            crate::currencies::Stars::parse(raw)
                .map(|s| s.0 as f64)
                .map_err(|e| anyhow!("Invalid floor price: {}", e))
        })
        .transpose()?;
    let floors = if override_floor.is_none() && sub.get_flag("live") {
        Market::new()?.floor_prices()
    } else {
        HashMap::new()
    };

    let data = unrealized_rows(&trades, &floors, override_floor);

    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.gift.clone(),
                    r.quantity.to_string(),
                    r.buy_price.clone(),
                    crate::currencies::Stars(r.floor_price).to_string(),
                    dash(r.unrealized_pnl, |p| {
                        crate::currencies::Stars(p).to_string()
                    }),
                    dash(r.unrealized_percent, format_percent),
                ]
            })
            .collect();
        println!(
            "{}",
            crate::utils::pretty_table(
                &["ID", "Gift", "Qty", "Buy", "Floor", "Unrealized", "%"],
                rows,
            )
        );
    }
    Ok(())
}
