// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Command, arg, value_parser};

pub fn build_cli() -> Command {
    Command::new("giftfolio")
        .about("Telegram gift trading journal: dual-currency PnL, commissions, market data")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("trade")
                .about("Record and inspect trades")
                .subcommand(
                    Command::new("add")
                        .about("Record a buy")
                        .arg(arg!(--name <NAME> "Gift collection name").required(true))
                        .arg(arg!(--number <NUMBER> "Collectible number").required(false))
                        .arg(arg!(--quantity <QTY> "Batch size, 1-9999 (default 1)").required(false))
                        .arg(arg!(--date <DATE> "Buy date YYYY-MM-DD").required(true))
                        .arg(arg!(--currency <CCY> "STARS or TON").required(true))
                        .arg(arg!(--price <PRICE> "Buy price per unit").required(true))
                        .arg(arg!(--flat <STARS> "Flat commission in Stars (STARS trades only)").required(false))
                        .arg(arg!(--permille <RATE> "Commission permille 0-1000").required(false))
                        .arg(arg!(--rate <USD> "Override locked USD rate").required(false))
                        .arg(arg!(--marketplace <MP> "fragment|getgems|tonkeeper|p2p|other").required(false))
                        .arg(arg!(--note <NOTE>).required(false))
                        .arg(arg!(--live "Fetch and lock the live TON/USD rate")),
                )
                .subcommand(
                    Command::new("sell")
                        .about("Close an open trade")
                        .arg(arg!(--id <ID> "Trade id").required(true).value_parser(value_parser!(i64)))
                        .arg(arg!(--price <PRICE> "Sell price per unit").required(true))
                        .arg(arg!(--date <DATE> "Sell date YYYY-MM-DD").required(true))
                        .arg(arg!(--rate <USD> "Override locked USD rate").required(false))
                        .arg(arg!(--marketplace <MP> "fragment|getgems|tonkeeper|p2p|other").required(false))
                        .arg(arg!(--live "Fetch and lock the live TON/USD rate")),
                )
                .subcommand(
                    Command::new("list")
                        .about("List trades with computed PnL")
                        .arg(arg!(--open "Open positions only"))
                        .arg(arg!(--closed "Closed trades only"))
                        .arg(arg!(--currency <CCY>).required(false))
                        .arg(arg!(--limit <N>).required(false).value_parser(value_parser!(usize)))
                        .arg(arg!(--json "Print JSON"))
                        .arg(arg!(--jsonl "Print JSON lines")),
                )
                .subcommand(
                    Command::new("value")
                        .about("Unrealized PnL of open positions against floor prices")
                        .arg(arg!(--live "Fetch live floor prices"))
                        .arg(arg!(--floor <STARS> "Manual floor price applied to every row").required(false))
                        .arg(arg!(--json "Print JSON"))
                        .arg(arg!(--jsonl "Print JSON lines")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a trade")
                        .arg(arg!(--id <ID>).required(true).value_parser(value_parser!(i64))),
                ),
        )
        .subcommand(
            Command::new("stats")
                .about("Dashboard statistics")
                .arg(arg!(--currency <CCY> "Restrict to STARS or TON").required(false))
                .arg(arg!(--period <PERIOD> "day|week|month|total (default total)").required(false))
                .arg(arg!(--json "Print JSON"))
                .arg(arg!(--jsonl "Print JSON lines")),
        )
        .subcommand(
            Command::new("analytics")
                .about("Charts and breakdowns")
                .subcommand(
                    Command::new("pnl")
                        .about("Cumulative PnL time series")
                        .arg(arg!(--range <RANGE> "7d|30d|90d|1y|all (default 30d)").required(false))
                        .arg(arg!(--granularity <GRAN> "day|week|month (default day)").required(false))
                        .arg(arg!(--currency <CCY> "STARS or TON (default STARS)").required(false))
                        .arg(arg!(--json "Print JSON"))
                        .arg(arg!(--jsonl "Print JSON lines")),
                )
                .subcommand(
                    Command::new("portfolio")
                        .about("Open positions by buy value")
                        .arg(arg!(--json "Print JSON"))
                        .arg(arg!(--jsonl "Print JSON lines")),
                )
                .subcommand(
                    Command::new("outcomes")
                        .about("Win/loss/breakeven counts")
                        .arg(arg!(--period <PERIOD> "week|month|total (default total)").required(false))
                        .arg(arg!(--json "Print JSON"))
                        .arg(arg!(--jsonl "Print JSON lines")),
                ),
        )
        .subcommand(
            Command::new("import").about("Import data").subcommand(
                Command::new("trades")
                    .about("Import trades from CSV")
                    .arg(arg!(--path <PATH>).required(true)),
            ),
        )
        .subcommand(
            Command::new("export").about("Export data").subcommand(
                Command::new("trades")
                    .about("Export trades")
                    .arg(arg!(--format <FMT> "csv|json").required(true))
                    .arg(arg!(--out <PATH>).required(true)),
            ),
        )
        .subcommand(
            Command::new("market")
                .about("Market data")
                .subcommand(Command::new("rates").about("Current USD exchange rates"))
                .subcommand(Command::new("floors").about("Gift collection floor prices")),
        )
}
