// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Currency primitives for the two gift-trading currencies.
//!
//! Stars are an integer-only in-app currency. TON is carried as an integer
//! count of nanotons (10^9 nanotons = 1 TON). All parsing is done on the
//! decimal string itself; amounts never round-trip through f64.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const TON_DECIMALS: usize = 9;
pub const NANOTON_PER_TON: i64 = 1_000_000_000;

/// Stars/USD rate, fixed by Telegram pricing.
pub const STARS_USD_RATE: f64 = 0.013;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount: empty")]
    Empty,
    #[error("invalid amount: multiple decimal points")]
    MultipleDecimalPoints,
    #[error("invalid amount: non-numeric characters")]
    NonNumeric,
    #[error("invalid amount: out of range")]
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CurrencyKind {
    #[serde(rename = "STARS")]
    Stars,
    #[serde(rename = "TON")]
    Ton,
}

impl CurrencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyKind::Stars => "STARS",
            CurrencyKind::Ton => "TON",
        }
    }

    /// Parse a human-entered amount into native smallest units.
    pub fn parse_amount(&self, input: &str) -> Result<i64, AmountError> {
        match self {
            CurrencyKind::Stars => Stars::parse(input).map(|s| s.0),
            CurrencyKind::Ton => NanoTon::parse(input).map(|n| n.0),
        }
    }

    /// Display string with currency marker ("1 234 ★" / "3.50 TON").
    pub fn format_amount(&self, native: i64) -> String {
        match self {
            CurrencyKind::Stars => Stars(native).to_string(),
            CurrencyKind::Ton => NanoTon(native).to_string(),
        }
    }

    /// Plain numeric string without marker, for CSV export and re-import.
    /// TON trailing zeros are stripped all the way ("5", not "5.00").
    pub fn raw_amount(&self, native: i64) -> String {
        match self {
            CurrencyKind::Stars => native.to_string(),
            CurrencyKind::Ton => NanoTon(native).to_plain_string(),
        }
    }
}

impl FromStr for CurrencyKind {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STARS" => Ok(CurrencyKind::Stars),
            "TON" => Ok(CurrencyKind::Ton),
            _ => Err(AmountError::NonNumeric),
        }
    }
}

impl fmt::Display for CurrencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-unit Stars amount. Negative values appear only in derived profit
/// figures; user input must be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stars(pub i64);

impl Stars {
    /// Strict non-negative integer literal: no sign, no decimal point.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::NonNumeric);
        }
        trimmed
            .parse::<i64>()
            .map(Stars)
            .map_err(|_| AmountError::OutOfRange)
    }
}

impl fmt::Display for Stars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ★", group_digits(self.0))
    }
}

/// TON amount in nanotons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NanoTon(pub i64);

impl NanoTon {
    /// Fixed-point parse with 9 decimal places. The fractional part is
    /// truncated (not rounded) beyond 9 digits. "5." is 5 TON; "." and ""
    /// are empty; a sign character fails as non-numeric.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "." {
            return Err(AmountError::Empty);
        }

        let mut parts = trimmed.split('.');
        let whole = parts.next().unwrap_or("0");
        let frac = parts.next().unwrap_or("");
        if parts.next().is_some() {
            return Err(AmountError::MultipleDecimalPoints);
        }

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::NonNumeric);
        }
        if !frac.is_empty() && !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::NonNumeric);
        }

        let frac = &frac[..frac.len().min(TON_DECIMALS)];
        let mut padded = String::with_capacity(TON_DECIMALS);
        padded.push_str(frac);
        while padded.len() < TON_DECIMALS {
            padded.push('0');
        }

        let whole: i64 = whole.parse().map_err(|_| AmountError::OutOfRange)?;
        let frac: i64 = padded.parse().map_err(|_| AmountError::OutOfRange)?;
        whole
            .checked_mul(NANOTON_PER_TON)
            .and_then(|n| n.checked_add(frac))
            .map(NanoTon)
            .ok_or(AmountError::OutOfRange)
    }

    fn split_abs(&self) -> (&'static str, u64, u64) {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        (
            sign,
            abs / NANOTON_PER_TON as u64,
            abs % NANOTON_PER_TON as u64,
        )
    }

    /// Plain numeric string, trailing zeros fully stripped ("5", "3.5").
    pub fn to_plain_string(&self) -> String {
        let (sign, whole, frac) = self.split_abs();
        let frac_str = format!("{:09}", frac);
        let frac_str = frac_str.trim_end_matches('0');
        if frac_str.is_empty() {
            format!("{}{}", sign, whole)
        } else {
            format!("{}{}.{}", sign, whole, frac_str)
        }
    }
}

impl fmt::Display for NanoTon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, whole, frac) = self.split_abs();
        let mut frac_str: String = format!("{:09}", frac)
            .trim_end_matches('0')
            .to_string();
        while frac_str.len() < 2 {
            frac_str.push('0');
        }
        write!(f, "{}{}.{} TON", sign, whole, frac_str)
    }
}

/// Group an integer's decimal digits in threes with non-breaking spaces
/// (ru-RU locale grouping), working on the digit string so values above
/// 2^53 keep their exact digits.
fn group_digits(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() * 2);
    if value < 0 {
        out.push('-');
    }
    let lead = digits.len() % 3;
    if lead > 0 {
        out.push_str(&digits[..lead]);
    }
    for (i, chunk) in digits.as_bytes()[lead..].chunks(3).enumerate() {
        if lead > 0 || i > 0 {
            out.push('\u{a0}');
        }
        out.push_str(std::str::from_utf8(chunk).expect("ascii digits"));
    }
    out
}
