// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::trades::{TradeFilter, load_trades};
use crate::currencies::CurrencyKind;
use crate::models::Trade;
use crate::pnl::{DashboardStats, TradeOutcome, aggregate_stats, calculate_profit};
use crate::utils::{dash, format_usd, maybe_print_json, pretty_table};
use anyhow::{Result, anyhow};
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Total,
}

impl Period {
    pub fn parse(raw: &str) -> Result<Period> {
        match raw.trim().to_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "total" => Ok(Period::Total),
            other => Err(anyhow!("Unknown period '{}' (use day|week|month|total)", other)),
        }
    }

    fn cutoff(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Day => Some(today - Duration::days(1)),
            Period::Week => Some(today - Duration::days(7)),
            Period::Month => Some(today - Duration::days(30)),
            Period::Total => None,
        }
    }
}

/// Periods other than `total` only look at trades closed within the window;
/// open positions still count for `total` so the dashboard shows them.
pub fn select_for_period(trades: &[Trade], period: Period, today: NaiveDate) -> Vec<&Trade> {
    match period.cutoff(today) {
        None => trades.iter().collect(),
        Some(cutoff) => trades
            .iter()
            .filter(|t| t.sell_date.is_some_and(|d| d >= cutoff))
            .collect(),
    }
}

pub fn stats_for(trades: &[&Trade]) -> DashboardStats {
    let outcomes: Vec<TradeOutcome> = trades
        .iter()
        .map(|t| TradeOutcome {
            currency: t.currency,
            result: calculate_profit(&t.profit_input()),
        })
        .collect();
    aggregate_stats(&outcomes)
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let period = m
        .get_one::<String>("period")
        .map(|s| Period::parse(s))
        .transpose()?
        .unwrap_or(Period::Total);
    let filter = TradeFilter {
        currency: m
            .get_one::<String>("currency")
            .map(|s| {
                s.parse::<CurrencyKind>()
                    .map_err(|_| anyhow!("Currency must be STARS or TON"))
            })
            .transpose()?,
        ..TradeFilter::default()
    };

    let trades = load_trades(conn, &filter)?;
    let today = chrono::Local::now().date_naive();
    let stats = stats_for(&select_for_period(&trades, period, today));

    if !maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &stats)? {
        print_stats(&stats);
    }
    Ok(())
}

fn print_stats(s: &DashboardStats) {
    let rows = vec![
        vec!["Total trades".into(), s.total_trades.to_string()],
        vec!["Open".into(), s.open_trades.to_string()],
        vec!["Closed".into(), s.closed_trades.to_string()],
        vec![
            "Profit (Stars)".into(),
            dash(s.total_profit_stars, |p| p.to_string()),
        ],
        vec![
            "Profit (TON)".into(),
            dash(s.total_profit_nanoton, |p| p.to_string()),
        ],
        vec![
            "Profit (USD)".into(),
            dash(s.total_profit_usd, format_usd),
        ],
        vec![
            "Win rate".into(),
            dash(s.win_rate, |w| format!("{}%", w)),
        ],
        vec![
            "Best (Stars)".into(),
            dash(s.best_trade_stars, |p| p.to_string()),
        ],
        vec![
            "Worst (Stars)".into(),
            dash(s.worst_trade_stars, |p| p.to_string()),
        ],
        vec![
            "Best (TON)".into(),
            dash(s.best_trade_nanoton, |p| p.to_string()),
        ],
        vec![
            "Worst (TON)".into(),
            dash(s.worst_trade_nanoton, |p| p.to_string()),
        ],
    ];
    println!("{}", pretty_table(&["Metric", "Value"], rows));
}
