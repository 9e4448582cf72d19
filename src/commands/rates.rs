// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::market::Market;
use crate::utils::pretty_table;
use anyhow::Result;

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("rates", _)) => rates(),
        Some(("floors", _)) => floors(),
        _ => Ok(()),
    }
}

fn rates() -> Result<()> {
    let market = Market::new()?;
    let ton = market
        .ton_usd_rate()
        .map(|r| format!("{:.4}", r))
        .unwrap_or_else(|| "—".to_string());
    let rows = vec![
        vec!["STARS".into(), format!("{:.4}", market.stars_usd_rate())],
        vec!["TON".into(), ton],
    ];
    println!("{}", pretty_table(&["Currency", "USD rate"], rows));
    Ok(())
}

fn floors() -> Result<()> {
    let market = Market::new()?;
    let mut floors: Vec<(String, f64)> = market.floor_prices().into_iter().collect();
    floors.sort_by(|a, b| a.0.cmp(&b.0));
    if floors.is_empty() {
        println!("No floor price data available");
        return Ok(());
    }
    let rows = floors
        .into_iter()
        .map(|(gift, floor)| vec![gift, format!("{:.0} ★", floor)])
        .collect();
    println!("{}", pretty_table(&["Gift", "Floor"], rows));
    Ok(())
}
