// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::currencies::CurrencyKind;
use crate::pnl::TradeInput;

/// Marketplaces a gift can be bought or sold on.
pub const MARKETPLACES: [&str; 5] = ["fragment", "getgems", "tonkeeper", "p2p", "other"];

pub const MIN_QUANTITY: i64 = 1;
pub const MAX_QUANTITY: i64 = 9999;
pub const MAX_PERMILLE: i64 = 1000;

/// One buy (and optionally one sell) of a batch of identical gifts.
///
/// `sell_price` and `sell_date` are set together or not at all; the flat
/// commission is Stars-denominated and must be zero on TON trades. Both
/// invariants are also enforced by CHECK constraints in the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub gift_name: String,
    pub gift_number: Option<String>,
    pub quantity: i64,
    pub buy_date: NaiveDate,
    pub sell_date: Option<NaiveDate>,
    pub currency: CurrencyKind,
    /// Native smallest unit of `currency` (Stars or nanotons).
    pub buy_price: i64,
    pub sell_price: Option<i64>,
    pub commission_flat_stars: i64,
    pub commission_permille: i64,
    /// USD rate locked when the buy was recorded, decimal string.
    pub buy_rate_usd: Option<String>,
    pub sell_rate_usd: Option<String>,
    pub buy_marketplace: Option<String>,
    pub sell_marketplace: Option<String>,
    pub note: Option<String>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.sell_price.is_none()
    }

    pub fn profit_input(&self) -> TradeInput {
        TradeInput {
            currency: self.currency,
            buy_price: self.buy_price,
            sell_price: self.sell_price,
            commission_flat_stars: self.commission_flat_stars,
            commission_permille: self.commission_permille,
            buy_rate_usd: self.buy_rate_usd.clone(),
            sell_rate_usd: self.sell_rate_usd.clone(),
            quantity: self.quantity,
        }
    }
}
