// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure profit/loss calculations.
//!
//! Native-unit money stays in i64 (Stars or nanotons, per the trade's
//! currency); i128 intermediates cover the permille product and percent
//! scaling. USD figures are f64 for display only and never feed back into
//! native-unit math. Absent data (open trade, missing rate, zero buy price)
//! is `None`, not an error.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::currencies::{CurrencyKind, NANOTON_PER_TON, NanoTon, Stars};

/// The trade fields the engine needs. Callers are expected to hand in rows
/// that already satisfy the storage invariants (sell price/date pairing,
/// zero flat fee on TON trades).
#[derive(Debug, Clone)]
pub struct TradeInput {
    pub currency: CurrencyKind,
    pub buy_price: i64,
    pub sell_price: Option<i64>,
    /// Flat fee, always denominated in Stars. Must be 0 for TON trades.
    pub commission_flat_stars: i64,
    /// Parts-per-thousand of the sell price, 0..=1000.
    pub commission_permille: i64,
    /// USD rate locked at buy time, decimal string.
    pub buy_rate_usd: Option<String>,
    /// USD rate locked at sell time, decimal string. Set together with the sell.
    pub sell_rate_usd: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfitResult {
    /// Net profit in native units, total over quantity. None while open.
    pub net_profit: Option<i64>,
    /// Profit before commission, total over quantity. None while open.
    pub gross_profit: Option<i64>,
    /// Commission deducted, total over quantity. None while open.
    pub total_commission: Option<i64>,
    /// Buy value in USD at the locked buy rate. None if rate unavailable.
    pub buy_value_usd: Option<f64>,
    pub sell_value_usd: Option<f64>,
    pub net_profit_usd: Option<f64>,
    /// Per-unit percentage; invariant under quantity. None while open or
    /// when the buy price is zero.
    pub profit_percent: Option<f64>,
}

/// Commission for selling one unit at `sell_price`.
///
/// The permille component rounds half up via `(price * permille + 500) / 1000`.
/// The flat fee is Stars-denominated, so it only applies to Stars trades.
pub fn calculate_commission(
    currency: CurrencyKind,
    sell_price: i64,
    commission_flat_stars: i64,
    commission_permille: i64,
) -> i64 {
    let permille_part =
        ((sell_price as i128 * commission_permille as i128 + 500) / 1000) as i64;
    match currency {
        CurrencyKind::Stars => commission_flat_stars + permille_part,
        CurrencyKind::Ton => permille_part,
    }
}

/// Full profit breakdown for one trade.
pub fn calculate_profit(trade: &TradeInput) -> ProfitResult {
    let qty = trade.quantity.max(1);

    let Some(sell_price) = trade.sell_price else {
        // Open trade: only the buy-side USD value is known.
        return ProfitResult {
            buy_value_usd: usd_value(
                trade.currency,
                trade.buy_price.saturating_mul(qty),
                trade.buy_rate_usd.as_deref(),
            ),
            ..ProfitResult::default()
        };
    };

    // Each unit in the batch is transferred (and charged) separately.
    // Batch totals saturate: a quantity up to 9999 can push a nanoton-scale
    // product past i64 even when every per-unit figure fits.
    let unit_commission = calculate_commission(
        trade.currency,
        sell_price,
        trade.commission_flat_stars,
        trade.commission_permille,
    );
    let unit_gross = sell_price.saturating_sub(trade.buy_price);
    let unit_net = unit_gross.saturating_sub(unit_commission);

    let total_commission = unit_commission.saturating_mul(qty);
    let gross_profit = unit_gross.saturating_mul(qty);
    let net_profit = unit_net.saturating_mul(qty);

    let buy_value_usd = usd_value(
        trade.currency,
        trade.buy_price.saturating_mul(qty),
        trade.buy_rate_usd.as_deref(),
    );
    let sell_value_usd = usd_value(
        trade.currency,
        sell_price.saturating_mul(qty),
        trade.sell_rate_usd.as_deref(),
    );

    // Commission is charged at sale time, so it converts at the sell rate.
    let net_profit_usd = match (buy_value_usd, sell_value_usd) {
        (Some(buy_usd), Some(sell_usd)) => usd_value(
            trade.currency,
            total_commission,
            trade.sell_rate_usd.as_deref(),
        )
        .map(|commission_usd| sell_usd - buy_usd - commission_usd),
        _ => None,
    };

    ProfitResult {
        net_profit: Some(net_profit),
        gross_profit: Some(gross_profit),
        total_commission: Some(total_commission),
        buy_value_usd,
        sell_value_usd,
        net_profit_usd,
        profit_percent: profit_percent(unit_net, trade.buy_price),
    }
}

/// Per-unit percentage with two decimal places of integer precision.
fn profit_percent(unit_net: i64, buy_price: i64) -> Option<f64> {
    if buy_price <= 0 {
        return None;
    }
    let scaled = (unit_net as i128 * 10_000) / buy_price as i128;
    Some(scaled as f64 / 100.0)
}

/// Convert a native-unit amount to USD with a locked rate string.
/// Returns None when the rate is absent, unparsable, or non-positive.
fn usd_value(currency: CurrencyKind, native: i64, rate: Option<&str>) -> Option<f64> {
    let rate = Decimal::from_str_exact(rate?.trim()).ok()?.to_f64()?;
    if rate <= 0.0 {
        return None;
    }
    match currency {
        CurrencyKind::Stars => Some(native as f64 * rate),
        CurrencyKind::Ton => Some(native as f64 / NANOTON_PER_TON as f64 * rate),
    }
}

/// Hypothetical result of selling an open position at the current floor.
#[derive(Debug, Clone, Serialize)]
pub struct UnrealizedPnl {
    /// Floor price in whole Stars; 0 when no floor data was available.
    pub floor_price: i64,
    /// Total over quantity, in Stars. None when no floor data or when the
    /// position is TON-denominated (floors are quoted in Stars only).
    pub unrealized_pnl: Option<i64>,
    pub unrealized_percent: Option<f64>,
}

/// Estimate profit if an open position were sold right now at `floor_price`
/// Stars. TON positions report the floor but no PnL: floor data carries no
/// Stars/TON cross-rate, and inventing one here would be wrong.
pub fn calculate_unrealized_pnl(
    buy_price: i64,
    currency: CurrencyKind,
    floor_price: f64,
    commission_flat_stars: i64,
    commission_permille: i64,
    quantity: i64,
) -> UnrealizedPnl {
    if !floor_price.is_finite() || floor_price <= 0.0 {
        return UnrealizedPnl {
            floor_price: 0,
            unrealized_pnl: None,
            unrealized_percent: None,
        };
    }
    let floor = floor_price.round() as i64;

    if currency == CurrencyKind::Ton {
        return UnrealizedPnl {
            floor_price: floor,
            unrealized_pnl: None,
            unrealized_percent: None,
        };
    }

    let unit_commission = calculate_commission(
        CurrencyKind::Stars,
        floor,
        commission_flat_stars,
        commission_permille,
    );
    let unit_net = floor.saturating_sub(buy_price).saturating_sub(unit_commission);

    UnrealizedPnl {
        floor_price: floor,
        unrealized_pnl: Some(unit_net.saturating_mul(quantity.max(1))),
        unrealized_percent: profit_percent(unit_net, buy_price),
    }
}

/// One computed trade plus the currency it is denominated in.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub currency: CurrencyKind,
    pub result: ProfitResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_trades: usize,
    pub open_trades: usize,
    pub closed_trades: usize,
    /// Per-currency totals are independently absent: no closed Stars trade
    /// means None here, which is not the same as a total of exactly zero.
    pub total_profit_stars: Option<Stars>,
    pub total_profit_nanoton: Option<NanoTon>,
    /// Blended USD total across both currencies, where rates were locked.
    pub total_profit_usd: Option<f64>,
    /// Percentage of closed trades with positive net profit, 0-100.
    pub win_rate: Option<u32>,
    pub best_trade_stars: Option<Stars>,
    pub worst_trade_stars: Option<Stars>,
    pub best_trade_nanoton: Option<NanoTon>,
    pub worst_trade_nanoton: Option<NanoTon>,
}

/// Fold per-trade results into dashboard statistics in a single pass.
/// Open trades count toward the totals but contribute nothing else.
pub fn aggregate_stats(trades: &[TradeOutcome]) -> DashboardStats {
    let mut total_stars: Option<i64> = None;
    let mut total_nanoton: Option<i64> = None;
    let mut total_usd: Option<f64> = None;
    let mut best_stars: Option<i64> = None;
    let mut worst_stars: Option<i64> = None;
    let mut best_nanoton: Option<i64> = None;
    let mut worst_nanoton: Option<i64> = None;
    let mut wins = 0usize;
    let mut closed = 0usize;

    for trade in trades {
        let Some(net) = trade.result.net_profit else {
            continue;
        };
        closed += 1;
        if net > 0 {
            wins += 1;
        }

        match trade.currency {
            CurrencyKind::Stars => {
                total_stars = Some(total_stars.unwrap_or(0).saturating_add(net));
                best_stars = Some(best_stars.map_or(net, |b| b.max(net)));
                worst_stars = Some(worst_stars.map_or(net, |w| w.min(net)));
            }
            CurrencyKind::Ton => {
                total_nanoton = Some(total_nanoton.unwrap_or(0).saturating_add(net));
                best_nanoton = Some(best_nanoton.map_or(net, |b| b.max(net)));
                worst_nanoton = Some(worst_nanoton.map_or(net, |w| w.min(net)));
            }
        }

        if let Some(usd) = trade.result.net_profit_usd {
            total_usd = Some(total_usd.unwrap_or(0.0) + usd);
        }
    }

    let win_rate = if closed > 0 {
        Some((wins as f64 / closed as f64 * 100.0).round() as u32)
    } else {
        None
    };

    DashboardStats {
        total_trades: trades.len(),
        open_trades: trades.len() - closed,
        closed_trades: closed,
        total_profit_stars: total_stars.map(Stars),
        total_profit_nanoton: total_nanoton.map(NanoTon),
        total_profit_usd: total_usd,
        win_rate,
        best_trade_stars: best_stars.map(Stars),
        worst_trade_stars: worst_stars.map(Stars),
        best_trade_nanoton: best_nanoton.map(NanoTon),
        worst_trade_nanoton: worst_nanoton.map(NanoTon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stars_trade(buy: i64, sell: Option<i64>) -> TradeInput {
        TradeInput {
            currency: CurrencyKind::Stars,
            buy_price: buy,
            sell_price: sell,
            commission_flat_stars: 0,
            commission_permille: 0,
            buy_rate_usd: Some("0.013".into()),
            sell_rate_usd: sell.map(|_| "0.013".into()),
            quantity: 1,
        }
    }

    #[test]
    fn commission_stars_flat_plus_permille() {
        // 50 + ROUND(1000 * 100 / 1000) = 150
        assert_eq!(calculate_commission(CurrencyKind::Stars, 1000, 50, 100), 150);
    }

    #[test]
    fn commission_stars_components_alone() {
        assert_eq!(calculate_commission(CurrencyKind::Stars, 1000, 50, 0), 50);
        assert_eq!(calculate_commission(CurrencyKind::Stars, 1000, 0, 50), 50);
        assert_eq!(calculate_commission(CurrencyKind::Stars, 1000, 0, 0), 0);
    }

    #[test]
    fn commission_full_permille_equals_sell_price() {
        assert_eq!(
            calculate_commission(CurrencyKind::Stars, 1000, 0, 1000),
            1000
        );
    }

    #[test]
    fn commission_ton_ignores_flat_fee() {
        assert_eq!(
            calculate_commission(CurrencyKind::Ton, 3_500_000_000, 100, 100),
            350_000_000
        );
        assert_eq!(
            calculate_commission(CurrencyKind::Ton, 1_000_000_000, 999, 50),
            50_000_000
        );
    }

    #[test]
    fn commission_rounds_half_up() {
        // (999 * 1 + 500) / 1000 = 1
        assert_eq!(calculate_commission(CurrencyKind::Stars, 999, 0, 1), 1);
        // (1 * 1 + 500) / 1000 = 0
        assert_eq!(calculate_commission(CurrencyKind::Stars, 1, 0, 1), 0);
    }

    #[test]
    fn commission_monotonic_in_rate_and_price() {
        let mut last = 0;
        for permille in [0, 1, 10, 100, 500, 1000] {
            let c = calculate_commission(CurrencyKind::Stars, 12_345, 7, permille);
            assert!(c >= last);
            last = c;
        }
        let mut last = 0;
        for sell in [0, 1, 999, 1000, 55_555, 1_000_000] {
            let c = calculate_commission(CurrencyKind::Stars, sell, 7, 50);
            assert!(c >= last);
            last = c;
        }
    }

    #[test]
    fn closed_stars_trade_profit() {
        let mut trade = stars_trade(1000, Some(1500));
        trade.commission_flat_stars = 50;
        trade.commission_permille = 100;

        let result = calculate_profit(&trade);
        assert_eq!(result.gross_profit, Some(500));
        assert_eq!(result.total_commission, Some(200));
        assert_eq!(result.net_profit, Some(300));
        assert!((result.buy_value_usd.unwrap() - 13.0).abs() < 1e-9);
        assert!((result.sell_value_usd.unwrap() - 19.5).abs() < 1e-9);
        assert!(result.net_profit_usd.is_some());
        assert!((result.profit_percent.unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn closed_stars_trade_loss() {
        let result = calculate_profit(&stars_trade(1000, Some(800)));
        assert_eq!(result.net_profit, Some(-200));
        assert!((result.profit_percent.unwrap() + 20.0).abs() < 1e-9);
    }

    #[test]
    fn open_trade_yields_nulls() {
        let mut trade = stars_trade(1000, None);
        trade.commission_flat_stars = 50;
        trade.commission_permille = 100;

        let result = calculate_profit(&trade);
        assert_eq!(result.net_profit, None);
        assert_eq!(result.gross_profit, None);
        assert_eq!(result.total_commission, None);
        assert_eq!(result.sell_value_usd, None);
        assert_eq!(result.net_profit_usd, None);
        assert_eq!(result.profit_percent, None);
        assert!((result.buy_value_usd.unwrap() - 13.0).abs() < 1e-9);
    }

    #[test]
    fn closed_ton_trade_permille_only() {
        let trade = TradeInput {
            currency: CurrencyKind::Ton,
            buy_price: 5_000_000_000,
            sell_price: Some(8_000_000_000),
            commission_flat_stars: 0,
            commission_permille: 50,
            buy_rate_usd: Some("3.50".into()),
            sell_rate_usd: Some("4.00".into()),
            quantity: 1,
        };
        let result = calculate_profit(&trade);
        assert_eq!(result.gross_profit, Some(3_000_000_000));
        assert_eq!(result.total_commission, Some(400_000_000));
        assert_eq!(result.net_profit, Some(2_600_000_000));
        assert!((result.buy_value_usd.unwrap() - 17.5).abs() < 1e-9);
        assert!((result.sell_value_usd.unwrap() - 32.0).abs() < 1e-9);
    }

    #[test]
    fn missing_rates_keep_native_profit() {
        let mut trade = stars_trade(1000, Some(1500));
        trade.buy_rate_usd = None;
        trade.sell_rate_usd = None;

        let result = calculate_profit(&trade);
        assert_eq!(result.net_profit, Some(500));
        assert_eq!(result.buy_value_usd, None);
        assert_eq!(result.sell_value_usd, None);
        assert_eq!(result.net_profit_usd, None);
    }

    #[test]
    fn garbage_or_nonpositive_rate_is_absent() {
        let mut trade = stars_trade(1000, Some(1500));
        trade.buy_rate_usd = Some("not-a-rate".into());
        trade.sell_rate_usd = Some("0".into());
        let result = calculate_profit(&trade);
        assert_eq!(result.buy_value_usd, None);
        assert_eq!(result.sell_value_usd, None);
    }

    #[test]
    fn zero_buy_price_has_no_percent() {
        let result = calculate_profit(&stars_trade(0, Some(500)));
        assert_eq!(result.net_profit, Some(500));
        assert_eq!(result.profit_percent, None);
    }

    #[test]
    fn quantity_scales_totals_not_percent() {
        let mut trade = stars_trade(1000, Some(1500));
        trade.buy_rate_usd = None;
        trade.sell_rate_usd = None;
        trade.quantity = 5;

        let result = calculate_profit(&trade);
        assert_eq!(result.net_profit, Some(2500));
        assert_eq!(result.gross_profit, Some(2500));
        assert!((result.profit_percent.unwrap() - 50.0).abs() < 1e-9);

        let unit = calculate_profit(&TradeInput {
            quantity: 1,
            ..trade.clone()
        });
        assert_eq!(unit.profit_percent, result.profit_percent);
    }

    #[test]
    fn quantity_scales_commission() {
        let mut trade = stars_trade(1000, Some(1500));
        trade.commission_flat_stars = 50;
        trade.commission_permille = 100;
        trade.quantity = 3;

        let result = calculate_profit(&trade);
        assert_eq!(result.total_commission, Some(600));
        assert_eq!(result.net_profit, Some(900));
    }

    #[test]
    fn open_trade_quantity_scales_buy_usd() {
        let mut trade = stars_trade(1000, None);
        trade.quantity = 5;
        let result = calculate_profit(&trade);
        assert_eq!(result.net_profit, None);
        assert!((result.buy_value_usd.unwrap() - 65.0).abs() < 1e-9);
    }

    #[test]
    fn nanoton_scale_batch_does_not_overflow() {
        // Per-unit figures fit in i64, but price * 9999 would not.
        let trade = TradeInput {
            currency: CurrencyKind::Ton,
            buy_price: 2_000_000_000_000_000_000,
            sell_price: Some(2_000_000_000_000_000_000),
            commission_flat_stars: 0,
            commission_permille: 0,
            buy_rate_usd: None,
            sell_rate_usd: None,
            quantity: 9999,
        };
        let result = calculate_profit(&trade);
        assert_eq!(result.gross_profit, Some(0));
        assert_eq!(result.net_profit, Some(0));
        assert_eq!(result.total_commission, Some(0));
        assert_eq!(result.buy_value_usd, None);
    }

    #[test]
    fn batch_totals_clamp_at_i64_bounds() {
        let mut trade = stars_trade(0, Some(i64::MAX));
        trade.buy_rate_usd = None;
        trade.sell_rate_usd = None;
        trade.quantity = 2;
        let result = calculate_profit(&trade);
        assert_eq!(result.net_profit, Some(i64::MAX));
        assert_eq!(result.gross_profit, Some(i64::MAX));
    }

    #[test]
    fn unrealized_batch_clamps_at_i64_max() {
        let u = calculate_unrealized_pnl(0, CurrencyKind::Stars, 9.0e15, 0, 0, 9999);
        assert_eq!(u.unrealized_pnl, Some(i64::MAX));
    }

    #[test]
    fn ton_trade_with_quantity() {
        let trade = TradeInput {
            currency: CurrencyKind::Ton,
            buy_price: 5_000_000_000,
            sell_price: Some(8_000_000_000),
            commission_flat_stars: 0,
            commission_permille: 50,
            buy_rate_usd: None,
            sell_rate_usd: None,
            quantity: 2,
        };
        let result = calculate_profit(&trade);
        assert_eq!(result.net_profit, Some(5_200_000_000));
        assert_eq!(result.total_commission, Some(800_000_000));
    }

    #[test]
    fn unrealized_stars_position() {
        let u = calculate_unrealized_pnl(1000, CurrencyKind::Stars, 1500.0, 50, 100, 1);
        assert_eq!(u.floor_price, 1500);
        // commission = 50 + 150 = 200; net = 1500 - 1000 - 200 = 300
        assert_eq!(u.unrealized_pnl, Some(300));
        assert!((u.unrealized_percent.unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn unrealized_scales_with_quantity_but_percent_does_not() {
        let u = calculate_unrealized_pnl(1000, CurrencyKind::Stars, 1500.0, 0, 0, 4);
        assert_eq!(u.unrealized_pnl, Some(2000));
        assert!((u.unrealized_percent.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unrealized_without_floor_data() {
        for floor in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let u = calculate_unrealized_pnl(1000, CurrencyKind::Stars, floor, 0, 0, 1);
            assert_eq!(u.floor_price, 0);
            assert_eq!(u.unrealized_pnl, None);
            assert_eq!(u.unrealized_percent, None);
        }
    }

    #[test]
    fn unrealized_ton_position_reports_floor_only() {
        let u = calculate_unrealized_pnl(5_000_000_000, CurrencyKind::Ton, 1500.0, 0, 50, 1);
        assert_eq!(u.floor_price, 1500);
        assert_eq!(u.unrealized_pnl, None);
        assert_eq!(u.unrealized_percent, None);
    }

    #[test]
    fn unrealized_zero_buy_price_has_no_percent() {
        let u = calculate_unrealized_pnl(0, CurrencyKind::Stars, 100.0, 0, 0, 1);
        assert_eq!(u.unrealized_pnl, Some(100));
        assert_eq!(u.unrealized_percent, None);
    }

    #[test]
    fn aggregate_mixed_trades() {
        let trades = vec![
            TradeOutcome {
                currency: CurrencyKind::Stars,
                result: calculate_profit(&stars_trade(1000, Some(1500))),
            },
            TradeOutcome {
                currency: CurrencyKind::Stars,
                result: calculate_profit(&stars_trade(1000, Some(800))),
            },
            TradeOutcome {
                currency: CurrencyKind::Stars,
                result: calculate_profit(&stars_trade(500, None)),
            },
        ];

        let stats = aggregate_stats(&trades);
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.open_trades, 1);
        assert_eq!(stats.closed_trades, 2);
        assert_eq!(stats.total_profit_stars, Some(Stars(300)));
        assert_eq!(stats.total_profit_nanoton, None);
        assert_eq!(stats.win_rate, Some(50));
        assert_eq!(stats.best_trade_stars, Some(Stars(500)));
        assert_eq!(stats.worst_trade_stars, Some(Stars(-200)));
        assert_eq!(stats.best_trade_nanoton, None);
        assert_eq!(stats.worst_trade_nanoton, None);
        assert!(stats.total_profit_usd.is_some());
    }

    #[test]
    fn aggregate_empty() {
        let stats = aggregate_stats(&[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.closed_trades, 0);
        assert_eq!(stats.win_rate, None);
        assert_eq!(stats.total_profit_stars, None);
        assert_eq!(stats.total_profit_usd, None);
    }

    #[test]
    fn aggregate_all_open() {
        let trades = vec![TradeOutcome {
            currency: CurrencyKind::Stars,
            result: calculate_profit(&stars_trade(1000, None)),
        }];
        let stats = aggregate_stats(&trades);
        assert_eq!(stats.total_trades, 1);
        assert_eq!(stats.open_trades, 1);
        assert_eq!(stats.closed_trades, 0);
        assert_eq!(stats.win_rate, None);
    }

    #[test]
    fn aggregate_only_ton_trades_keeps_stars_absent() {
        let trade = TradeInput {
            currency: CurrencyKind::Ton,
            buy_price: 5_000_000_000,
            sell_price: Some(8_000_000_000),
            commission_flat_stars: 0,
            commission_permille: 0,
            buy_rate_usd: None,
            sell_rate_usd: None,
            quantity: 1,
        };
        let stats = aggregate_stats(&[TradeOutcome {
            currency: CurrencyKind::Ton,
            result: calculate_profit(&trade),
        }]);
        assert_eq!(stats.total_profit_stars, None);
        assert_eq!(stats.total_profit_nanoton, Some(NanoTon(3_000_000_000)));
        assert_eq!(stats.best_trade_nanoton, Some(NanoTon(3_000_000_000)));
    }
}
