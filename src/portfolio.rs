// src/portfolio.rs
use crate::db::{self, Database};
use crate::error::{AppError, Result};
use crate::models::{
    Direction, Holding, PortfolioSummary, Quote, TradeReceipt, Transaction, UserId,
};
use crate::quote::QuoteProvider;
use crate::validation::{ensure_positive_shares, normalize_symbol};
use chrono::{DateTime, SubsecRound, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Holdings, valuation and trade settlement over the history ledger.
#[derive(Clone)]
pub struct PortfolioService {
    db: Database,
    quotes: Arc<dyn QuoteProvider>,
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

fn trade_value(price: Decimal, shares: i64) -> Result<Decimal> {
    price
        .checked_mul(Decimal::from(shares))
        .ok_or_else(|| AppError::InvalidQuantity("number of shares is too large".into()))
}

impl PortfolioService {
    pub fn new(db: Database, quotes: Arc<dyn QuoteProvider>) -> Self {
        PortfolioService { db, quotes }
    }

    /// Live quote for `symbol`, or `UnknownSymbol`.
    pub async fn quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = normalize_symbol(symbol)?;
        let quote = self.quotes.lookup(&symbol).await?;
        quote.ok_or(AppError::UnknownSymbol(symbol))
    }

    /// Active positions ordered by symbol, each valued at the live price.
    pub async fn holdings(&self, user_id: UserId) -> Result<Vec<Holding>> {
        let positions = self.db.read(|conn| db::holdings(conn, user_id)).await?;
        self.value_positions(positions).await
    }

    async fn value_positions(&self, positions: BTreeMap<String, i64>) -> Result<Vec<Holding>> {
        let mut holdings = Vec::with_capacity(positions.len());
        for (symbol, shares) in positions {
            let holding = match self.quotes.lookup(&symbol).await? {
                Some(quote) => Holding {
                    total: trade_value(quote.price, shares)?,
                    symbol,
                    name: quote.name,
                    shares,
                    price: quote.price,
                },
                None => {
                    warn!("No quote for held symbol {}, valuing at zero", symbol);
                    Holding {
                        name: symbol.clone(),
                        symbol,
                        shares,
                        price: Decimal::ZERO,
                        total: Decimal::ZERO,
                    }
                }
            };
            holdings.push(holding);
        }
        Ok(holdings)
    }

    /// Positions and cash are read together, so a trade settling during the
    /// quote lookups is either fully counted or not at all.
    pub async fn summary(&self, user_id: UserId) -> Result<PortfolioSummary> {
        let (positions, cash) = self
            .db
            .read(|conn| Ok((db::holdings(conn, user_id)?, db::get_cash(conn, user_id)?)))
            .await?;
        let holdings = self.value_positions(positions).await?;

        let overflow = || AppError::Internal("portfolio value overflow".into());
        let holdings_value = holdings
            .iter()
            .try_fold(Decimal::ZERO, |acc, h| acc.checked_add(h.total))
            .ok_or_else(overflow)?;
        let total = cash.checked_add(holdings_value).ok_or_else(overflow)?;
        Ok(PortfolioSummary {
            total,
            holdings,
            cash,
            holdings_value,
        })
    }

    /// Cash plus the value of every holding at current prices.
    pub async fn net_worth(&self, user_id: UserId) -> Result<Decimal> {
        Ok(self.summary(user_id).await?.total)
    }

    pub async fn buy(&self, user_id: UserId, symbol: &str, shares: i64) -> Result<TradeReceipt> {
        let quote = self.quote(symbol).await?;
        ensure_positive_shares(shares)?;
        let cost = trade_value(quote.price, shares)?;
        let executed_at = now();

        let cash = self
            .db
            .transaction(|conn| {
                let available = db::get_cash(conn, user_id)?;
                if cost > available {
                    return Err(AppError::InsufficientFunds {
                        needed: cost,
                        available,
                    });
                }
                let cash = available - cost;
                db::set_cash(conn, user_id, cash)?;
                db::insert_transaction(
                    conn,
                    user_id,
                    &quote.symbol,
                    quote.price,
                    shares,
                    executed_at,
                )?;
                Ok(cash)
            })
            .await?;

        info!(
            "User {} bought {} {} @ {} for {}",
            user_id, shares, quote.symbol, quote.price, cost
        );
        Ok(TradeReceipt {
            direction: Direction::Buy,
            symbol: quote.symbol,
            name: quote.name,
            shares,
            price: quote.price,
            amount: cost,
            cash,
        })
    }

    pub async fn sell(&self, user_id: UserId, symbol: &str, shares: i64) -> Result<TradeReceipt> {
        let quote = self.quote(symbol).await?;
        ensure_positive_shares(shares)?;
        let proceeds = trade_value(quote.price, shares)?;
        let executed_at = now();

        let cash = self
            .db
            .transaction(|conn| {
                let positions = db::holdings(conn, user_id)?;
                let owned = *positions
                    .get(&quote.symbol)
                    .ok_or_else(|| AppError::NotOwned(quote.symbol.clone()))?;
                if shares > owned {
                    return Err(AppError::InsufficientShares {
                        symbol: quote.symbol.clone(),
                        requested: shares,
                        owned,
                    });
                }
                let cash = db::get_cash(conn, user_id)?
                    .checked_add(proceeds)
                    .ok_or_else(|| AppError::Internal("cash balance overflow".into()))?;
                db::set_cash(conn, user_id, cash)?;
                db::insert_transaction(
                    conn,
                    user_id,
                    &quote.symbol,
                    quote.price,
                    -shares,
                    executed_at,
                )?;
                Ok(cash)
            })
            .await?;

        info!(
            "User {} sold {} {} @ {} for {}",
            user_id, shares, quote.symbol, quote.price, proceeds
        );
        Ok(TradeReceipt {
            direction: Direction::Sell,
            symbol: quote.symbol,
            name: quote.name,
            shares,
            price: quote.price,
            amount: proceeds,
            cash,
        })
    }

    /// Every ledger row for the user, oldest first.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        self.db.read(|conn| db::transactions(conn, user_id)).await
    }
}
