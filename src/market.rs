// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Market data boundary: TON/USD exchange rate and gift-collection floor
//! prices. Both sit behind TTL caches with stale-on-failure fallback; the
//! PnL engine itself never fetches, it only consumes resolved values.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::currencies::STARS_USD_RATE;

pub const TON_RATE_TTL: Duration = Duration::from_secs(5 * 60);
pub const FLOOR_TTL: Duration = Duration::from_secs(60 * 60);

/// A single cached value with a TTL and an injectable clock.
///
/// The refresh runs while the slot's lock is held, so concurrent callers in
/// one process coalesce on a single fetch. On refresh failure the previous
/// value is served stale rather than dropped.
pub struct TtlCache<T: Clone> {
    ttl: Duration,
    clock: fn() -> Instant,
    slot: Mutex<Option<(T, Instant)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Instant::now)
    }

    pub fn with_clock(ttl: Duration, clock: fn() -> Instant) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached value if fresh, otherwise refresh. Returns None
    /// only when there is no value at all and the refresh failed.
    pub fn get_or_refresh<F>(&self, refresh: F) -> Option<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut slot = self.slot.lock().expect("cache lock poisoned");
        let now = (self.clock)();
        if let Some((value, fetched_at)) = slot.as_ref() {
            if now.duration_since(*fetched_at) < self.ttl {
                return Some(value.clone());
            }
        }
        match refresh() {
            Ok(value) => {
                *slot = Some((value.clone(), now));
                Some(value)
            }
            // Stale-while-revalidate: keep serving the old value.
            Err(_) => slot.as_ref().map(|(value, _)| value.clone()),
        }
    }
}

/// Owned market-data handle: one HTTP client plus the two caches.
pub struct Market {
    client: reqwest::blocking::Client,
    ton_usd: TtlCache<f64>,
    floors: TtlCache<HashMap<String, f64>>,
}

impl Market {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: crate::utils::http_client()?,
            ton_usd: TtlCache::new(TON_RATE_TTL),
            floors: TtlCache::new(FLOOR_TTL),
        })
    }

    /// Stars/USD is fixed by Telegram; no fetch involved.
    pub fn stars_usd_rate(&self) -> f64 {
        STARS_USD_RATE
    }

    pub fn ton_usd_rate(&self) -> Option<f64> {
        self.ton_usd
            .get_or_refresh(|| fetch_ton_usd_rate(&self.client))
    }

    /// Floor prices in Stars keyed by collection name. Empty map when no
    /// data could be fetched and nothing is cached.
    pub fn floor_prices(&self) -> HashMap<String, f64> {
        self.floors
            .get_or_refresh(|| fetch_floor_prices(&self.client))
            .unwrap_or_default()
    }
}

/// TON/USD from Binance, falling back to OKX.
pub fn fetch_ton_usd_rate(client: &reqwest::blocking::Client) -> Result<f64> {
    fetch_binance_ton_rate(client).or_else(|_| fetch_okx_ton_rate(client))
}

fn fetch_binance_ton_rate(client: &reqwest::blocking::Client) -> Result<f64> {
    #[derive(serde::Deserialize)]
    struct Ticker {
        price: String,
    }
    let resp = client
        .get("https://api.binance.com/api/v3/ticker/price?symbol=TONUSDT")
        .send()?
        .error_for_status()?;
    let t: Ticker = resp.json()?;
    let rate: f64 = t.price.parse()?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(anyhow!("Binance returned invalid price '{}'", t.price));
    }
    Ok(rate)
}

fn fetch_okx_ton_rate(client: &reqwest::blocking::Client) -> Result<f64> {
    #[derive(serde::Deserialize)]
    struct Okx {
        data: Option<Vec<OkxTicker>>,
    }
    #[derive(serde::Deserialize)]
    struct OkxTicker {
        last: String,
    }
    let resp = client
        .get("https://www.okx.com/api/v5/market/ticker?instId=TON-USDT")
        .send()?
        .error_for_status()?;
    let o: Okx = resp.json()?;
    let last = o
        .data
        .as_deref()
        .and_then(|d| d.first())
        .ok_or_else(|| anyhow!("OKX response missing ticker data"))?;
    let rate: f64 = last.last.parse()?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(anyhow!("OKX returned invalid price '{}'", last.last));
    }
    Ok(rate)
}

/// Floor prices per collection from giftasset.pro. The endpoint has shipped
/// both an array and an object shape, so decode tolerantly from Value.
pub fn fetch_floor_prices(client: &reqwest::blocking::Client) -> Result<HashMap<String, f64>> {
    let resp = client
        .get("https://giftasset.pro/api/v1/gifts/get_gifts_collections_marketcap")
        .send()?
        .error_for_status()?;
    let raw: serde_json::Value = resp.json()?;
    Ok(parse_floor_response(&raw))
}

fn parse_floor_response(raw: &serde_json::Value) -> HashMap<String, f64> {
    let mut out = HashMap::new();

    if let Some(items) = raw.as_array() {
        for item in items {
            let name = item
                .get("collection_name")
                .or_else(|| item.get("name"))
                .and_then(|v| v.as_str());
            let floor = item
                .get("floor")
                .or_else(|| item.get("floor_price"))
                .and_then(|v| v.as_f64());
            if let (Some(name), Some(floor)) = (name, floor) {
                if floor > 0.0 {
                    out.insert(name.to_string(), floor);
                }
            }
        }
        return out;
    }

    if let Some(map) = raw.as_object() {
        for (name, value) in map {
            let floor = value
                .as_f64()
                .or_else(|| value.get("floor").and_then(|v| v.as_f64()));
            if let Some(floor) = floor {
                if floor > 0.0 {
                    out.insert(name.clone(), floor);
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cache_serves_fresh_value_without_refetch() {
        let cache = TtlCache::new(Duration::from_secs(300));
        let calls = AtomicUsize::new(0);
        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42.0)
        };
        assert_eq!(cache.get_or_refresh(fetch), Some(42.0));
        assert_eq!(
            cache.get_or_refresh(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(99.0)
            }),
            Some(42.0)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cache_with_zero_ttl_refreshes_every_time() {
        let cache = TtlCache::new(Duration::ZERO);
        assert_eq!(cache.get_or_refresh(|| Ok(1)), Some(1));
        assert_eq!(cache.get_or_refresh(|| Ok(2)), Some(2));
    }

    #[test]
    fn cache_falls_back_to_stale_on_failure() {
        let cache = TtlCache::new(Duration::ZERO);
        assert_eq!(cache.get_or_refresh(|| Ok(7)), Some(7));
        assert_eq!(
            cache.get_or_refresh(|| Err(anyhow!("network down"))),
            Some(7)
        );
    }

    #[test]
    fn cache_empty_and_failing_yields_none() {
        let cache: TtlCache<f64> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get_or_refresh(|| Err(anyhow!("no data"))), None);
    }

    #[test]
    fn floor_response_array_shape() {
        let raw = json!([
            {"collection_name": "EasterEgg", "floor": 625.0},
            {"name": "SnowGlobe", "floor_price": 310.5},
            {"collection_name": "Broken", "floor": -3.0},
            {"collection_name": "NoFloor"}
        ]);
        let floors = parse_floor_response(&raw);
        assert_eq!(floors.get("EasterEgg"), Some(&625.0));
        assert_eq!(floors.get("SnowGlobe"), Some(&310.5));
        assert!(!floors.contains_key("Broken"));
        assert!(!floors.contains_key("NoFloor"));
    }

    #[test]
    fn floor_response_object_shape() {
        let raw = json!({
            "EasterEgg": 625.0,
            "SnowGlobe": {"floor": 310.5},
            "Zeroed": 0.0
        });
        let floors = parse_floor_response(&raw);
        assert_eq!(floors.get("EasterEgg"), Some(&625.0));
        assert_eq!(floors.get("SnowGlobe"), Some(&310.5));
        assert!(!floors.contains_key("Zeroed"));
    }
}
