// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::trades::{TradeFilter, load_trades};
use crate::currencies::CurrencyKind;
use crate::models::Trade;
use crate::pnl::calculate_profit;
use crate::utils::{dash, format_percent, maybe_print_json, pretty_table};
use anyhow::{Result, anyhow};
use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("pnl", sub)) => pnl_series(conn, sub)?,
        Some(("portfolio", sub)) => portfolio(conn, sub)?,
        Some(("outcomes", sub)) => outcomes(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    fn parse(raw: &str) -> Result<Granularity> {
        match raw.trim().to_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            other => Err(anyhow!("Unknown granularity '{}' (use day|week|month)", other)),
        }
    }

    /// Map a date to the first day of its bucket.
    fn bucket(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

fn range_cutoff(raw: &str, today: NaiveDate) -> Result<Option<NaiveDate>> {
    match raw.trim().to_lowercase().as_str() {
        "7d" => Ok(Some(today - Duration::days(7))),
        "30d" => Ok(Some(today - Duration::days(30))),
        "90d" => Ok(Some(today - Duration::days(90))),
        "1y" => Ok(Some(today - Duration::days(365))),
        "all" => Ok(None),
        other => Err(anyhow!("Unknown range '{}' (use 7d|30d|90d|1y|all)", other)),
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PnlPoint {
    pub bucket: NaiveDate,
    pub net_profit: i64,
    pub cumulative: i64,
    pub trades: usize,
}

/// Bucket closed trades of one currency by sell date and carry a running
/// total. Buckets with no trades are simply absent from the series.
pub fn pnl_time_series(
    trades: &[Trade],
    currency: CurrencyKind,
    cutoff: Option<NaiveDate>,
    granularity: Granularity,
) -> Vec<PnlPoint> {
    let mut buckets: BTreeMap<NaiveDate, (i64, usize)> = BTreeMap::new();
    for t in trades {
        if t.currency != currency {
            continue;
        }
        let Some(sell_date) = t.sell_date else {
            continue;
        };
        if cutoff.is_some_and(|c| sell_date < c) {
            continue;
        }
        let Some(net) = calculate_profit(&t.profit_input()).net_profit else {
            continue;
        };
        let entry = buckets.entry(granularity.bucket(sell_date)).or_insert((0, 0));
        entry.0 = entry.0.saturating_add(net);
        entry.1 += 1;
    }

    let mut cumulative = 0i64;
    buckets
        .into_iter()
        .map(|(bucket, (net, count))| {
            cumulative = cumulative.saturating_add(net);
            PnlPoint {
                bucket,
                net_profit: net,
                cumulative,
                trades: count,
            }
        })
        .collect()
}

fn pnl_series(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let cutoff = range_cutoff(
        sub.get_one::<String>("range").map(|s| s.as_str()).unwrap_or("30d"),
        today,
    )?;
    let granularity = sub
        .get_one::<String>("granularity")
        .map(|s| Granularity::parse(s))
        .transpose()?
        .unwrap_or(Granularity::Day);
    let currency = sub
        .get_one::<String>("currency")
        .map(|s| {
            s.parse::<CurrencyKind>()
                .map_err(|_| anyhow!("Currency must be STARS or TON"))
        })
        .transpose()?
        .unwrap_or(CurrencyKind::Stars);

    let trades = load_trades(conn, &TradeFilter::default())?;
    let series = pnl_time_series(&trades, currency, cutoff, granularity);

    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &series)? {
        let rows = series
            .iter()
            .map(|p| {
                vec![
                    p.bucket.to_string(),
                    p.trades.to_string(),
                    currency.format_amount(p.net_profit),
                    currency.format_amount(p.cumulative),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Bucket", "Trades", "Net", "Cumulative"], rows)
        );
    }
    Ok(())
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PortfolioSlice {
    pub gift: String,
    pub currency: String,
    pub quantity: i64,
    pub buy_value: i64,
}

/// Open positions grouped by collection and currency, largest buy value
/// first, capped at the top ten slices.
pub fn portfolio_slices(trades: &[Trade]) -> Vec<PortfolioSlice> {
    let mut groups: BTreeMap<(String, CurrencyKind), (i64, i64)> = BTreeMap::new();
    for t in trades {
        if !t.is_open() {
            continue;
        }
        let entry = groups
            .entry((t.gift_name.clone(), t.currency))
            .or_insert((0, 0));
        entry.0 += t.quantity;
        // Batch totals saturate rather than wrap at nanoton scale.
        entry.1 = entry.1.saturating_add(t.buy_price.saturating_mul(t.quantity));
    }
    let mut slices: Vec<PortfolioSlice> = groups
        .into_iter()
        .map(|((gift, currency), (quantity, buy_value))| PortfolioSlice {
            gift,
            currency: currency.as_str().to_string(),
            quantity,
            buy_value,
        })
        .collect();
    slices.sort_by(|a, b| b.buy_value.cmp(&a.buy_value).then(a.gift.cmp(&b.gift)));
    slices.truncate(10);
    slices
}

fn portfolio(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let trades = load_trades(
        conn,
        &TradeFilter {
            open_only: true,
            ..TradeFilter::default()
        },
    )?;
    let slices = portfolio_slices(&trades);

    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &slices)? {
        let rows = slices
            .iter()
            .map(|s| {
                let ccy: CurrencyKind = s.currency.parse().unwrap_or(CurrencyKind::Stars);
                vec![
                    s.gift.clone(),
                    s.currency.clone(),
                    s.quantity.to_string(),
                    ccy.format_amount(s.buy_value),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Gift", "Currency", "Qty", "Buy value"], rows)
        );
    }
    Ok(())
}

#[derive(Debug, Serialize, PartialEq)]
pub struct OutcomeCounts {
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    pub win_rate: Option<f64>,
}

/// Classify closed trades by the sign of net profit. Win rate counts
/// breakeven trades in the denominator but not as wins.
pub fn count_outcomes(trades: &[Trade], cutoff: Option<NaiveDate>) -> OutcomeCounts {
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut breakeven = 0usize;
    for t in trades {
        let Some(sell_date) = t.sell_date else {
            continue;
        };
        if cutoff.is_some_and(|c| sell_date < c) {
            continue;
        }
        let Some(net) = calculate_profit(&t.profit_input()).net_profit else {
            continue;
        };
        match net.cmp(&0) {
            std::cmp::Ordering::Greater => wins += 1,
            std::cmp::Ordering::Less => losses += 1,
            std::cmp::Ordering::Equal => breakeven += 1,
        }
    }
    let closed = wins + losses + breakeven;
    let win_rate = if closed > 0 {
        Some((wins as f64 / closed as f64 * 1000.0).round() / 10.0)
    } else {
        None
    };
    OutcomeCounts {
        wins,
        losses,
        breakeven,
        win_rate,
    }
}

fn outcomes(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let cutoff = match sub
        .get_one::<String>("period")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        None | Some("total") => None,
        Some("week") => Some(today - Duration::days(7)),
        Some("month") => Some(today - Duration::days(30)),
        Some(other) => {
            return Err(anyhow!("Unknown period '{}' (use week|month|total)", other));
        }
    };

    let trades = load_trades(conn, &TradeFilter::default())?;
    let counts = count_outcomes(&trades, cutoff);

    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &counts)? {
        let rows = vec![
            vec!["Wins".into(), counts.wins.to_string()],
            vec!["Losses".into(), counts.losses.to_string()],
            vec!["Breakeven".into(), counts.breakeven.to_string()],
            vec!["Win rate".into(), dash(counts.win_rate, format_percent)],
        ];
        println!("{}", pretty_table(&["Outcome", "Count"], rows));
    }
    Ok(())
}
