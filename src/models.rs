// src/models.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an authenticated user, passed explicitly into every service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub cash: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
}

/// Net position in one symbol, valued at the live quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub shares: i64,
    pub price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub holdings: Vec<Holding>,
    pub cash: Decimal,
    pub holdings_value: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn from_quantity(quantity: i64) -> Self {
        if quantity > 0 {
            Direction::Buy
        } else {
            Direction::Sell
        }
    }
}

/// One row of the append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub symbol: String,
    pub price: Decimal,
    pub quantity: i64,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
}

/// Outcome of a settled buy or sell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeReceipt {
    pub direction: Direction,
    pub symbol: String,
    pub name: String,
    pub shares: i64,
    pub price: Decimal,
    pub amount: Decimal,
    pub cash: Decimal,
}

/// Formats an amount as US dollars, e.g. `$1,234.50`.
pub fn usd(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn usd_groups_thousands() {
        assert_eq!(usd(dec!(1234.5)), "$1,234.50");
        assert_eq!(usd(dec!(10000)), "$10,000.00");
        assert_eq!(usd(dec!(999.999)), "$1,000.00");
        assert_eq!(usd(dec!(0)), "$0.00");
        assert_eq!(usd(dec!(-42.1)), "-$42.10");
    }

    #[test]
    fn direction_follows_quantity_sign() {
        assert_eq!(Direction::from_quantity(3), Direction::Buy);
        assert_eq!(Direction::from_quantity(-3), Direction::Sell);
    }
}
