// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Giftfolio", "giftfolio"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("giftfolio.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- Prices are INTEGER: whole Stars, or nanotons for TON trades.
    -- Locked USD rates stay TEXT so decimal strings survive storage exactly.
    CREATE TABLE IF NOT EXISTS trades(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        gift_name TEXT NOT NULL,
        gift_number TEXT,
        quantity INTEGER NOT NULL DEFAULT 1 CHECK(quantity BETWEEN 1 AND 9999),
        buy_date TEXT NOT NULL,
        sell_date TEXT,
        currency TEXT NOT NULL CHECK(currency IN ('STARS','TON')),
        buy_price INTEGER NOT NULL CHECK(buy_price >= 0),
        sell_price INTEGER CHECK(sell_price >= 0),
        commission_flat_stars INTEGER NOT NULL DEFAULT 0 CHECK(commission_flat_stars >= 0),
        commission_permille INTEGER NOT NULL DEFAULT 0 CHECK(commission_permille BETWEEN 0 AND 1000),
        buy_rate_usd TEXT,
        sell_rate_usd TEXT,
        buy_marketplace TEXT,
        sell_marketplace TEXT,
        note TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        -- sell price and sell date travel together
        CHECK((sell_price IS NULL) = (sell_date IS NULL)),
        -- flat fee is Stars-denominated; it cannot attach to a TON trade
        CHECK(currency = 'STARS' OR commission_flat_stars = 0)
    );
    CREATE INDEX IF NOT EXISTS idx_trades_sell_date ON trades(sell_date);
    CREATE INDEX IF NOT EXISTS idx_trades_gift_name ON trades(gift_name);
    "#,
    )?;
    Ok(())
}
