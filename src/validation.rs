// src/validation.rs
//! Typed request forms. Raw form fields arrive as optional strings and are
//! checked here before anything reaches the account or portfolio services.
use crate::error::{AppError, Result};
use serde::Deserialize;

/// Returns the trimmed value, or a validation error naming the field.
pub fn require(field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Validation(format!("must provide {}", field))),
    }
}

fn verbatim(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("must provide {}", field))),
    }
}

pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim();
    if symbol.is_empty() {
        return Err(AppError::Validation("must provide a symbol".into()));
    }
    Ok(symbol.to_uppercase())
}

pub fn ensure_positive_shares(shares: i64) -> Result<()> {
    if shares < 1 {
        return Err(AppError::InvalidQuantity(
            "number of shares must be a positive integer".into(),
        ));
    }
    Ok(())
}

pub fn ensure_positive_amount(amount: i64) -> Result<()> {
    if amount < 1 {
        return Err(AppError::Validation("amount must be one or more".into()));
    }
    Ok(())
}

fn parse_shares(raw: Option<&str>) -> Result<i64> {
    let raw = require("a number of shares", raw)?;
    let shares = raw
        .parse::<i64>()
        .map_err(|_| AppError::InvalidQuantity("number of shares must be an integer".into()))?;
    ensure_positive_shares(shares)?;
    Ok(shares)
}

fn parse_amount(raw: Option<&str>) -> Result<i64> {
    let raw = require("an amount to deposit or withdraw", raw)?;
    let amount = raw
        .parse::<i64>()
        .map_err(|_| AppError::Validation("amount must be an integer".into()))?;
    ensure_positive_amount(amount)?;
    Ok(amount)
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub confirmation: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirmation: String,
}

impl RegisterForm {
    pub fn validate(self) -> Result<RegisterRequest> {
        // Credentials are taken verbatim; only emptiness is checked.
        let username = verbatim("username", self.username)?;
        let password = verbatim("password", self.password)?;
        Ok(RegisterRequest {
            username,
            password,
            confirmation: self.confirmation.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(self) -> Result<LoginRequest> {
        let username = verbatim("username", self.username)?;
        let password = verbatim("password", self.password)?;
        Ok(LoginRequest { username, password })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteForm {
    pub symbol: Option<String>,
}

impl QuoteForm {
    pub fn validate(self) -> Result<String> {
        normalize_symbol(self.symbol.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TradeForm {
    pub symbol: Option<String>,
    pub shares: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct TradeRequest {
    pub symbol: String,
    pub shares: i64,
}

impl TradeForm {
    pub fn validate(self) -> Result<TradeRequest> {
        let symbol = normalize_symbol(self.symbol.as_deref().unwrap_or_default())?;
        let shares = parse_shares(self.shares.as_deref())?;
        Ok(TradeRequest { symbol, shares })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashDirection {
    Deposit,
    Withdraw,
}

impl CashDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashDirection::Deposit => "deposit",
            CashDirection::Withdraw => "withdraw",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ManageForm {
    pub direction: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct CashRequest {
    pub direction: CashDirection,
    pub amount: i64,
}

impl ManageForm {
    pub fn validate(self) -> Result<CashRequest> {
        let direction = match require("a direction", self.direction.as_deref())?.as_str() {
            "deposit" => CashDirection::Deposit,
            "withdraw" => CashDirection::Withdraw,
            _ => {
                return Err(AppError::Validation(
                    "direction must be either deposit or withdraw".into(),
                ))
            }
        };
        let amount = parse_amount(self.amount.as_deref())?;
        Ok(CashRequest { direction, amount })
    }
}
