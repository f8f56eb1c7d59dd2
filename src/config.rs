// src/config.rs
use crate::error::{AppError, Result};
use rust_decimal::Decimal;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_STARTING_CASH: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 2);
const DEFAULT_QUOTE_API_URL: &str = "https://www.alphavantage.co/query";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub alphavantage_api_key: String,
    pub quote_api_url: String,
    pub starting_cash: Decimal,
}

impl Config {
    /// Reads settings from the process environment. Call `dotenv` first to
    /// pick up a local `.env`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| AppError::Config(format!("{} is not set", key)))
        };

        let starting_cash = match get("STARTING_CASH") {
            Some(raw) => parse("STARTING_CASH", &raw)?,
            None => DEFAULT_STARTING_CASH,
        };
        if starting_cash.is_sign_negative() {
            return Err(AppError::Config("STARTING_CASH must not be negative".into()));
        }

        Ok(Config {
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("finance.db")),
            bind_addr: match get("BIND_ADDR") {
                Some(raw) => parse("BIND_ADDR", &raw)?,
                None => SocketAddr::from(([127, 0, 0, 1], 3030)),
            },
            jwt_secret: required("JWT_SECRET")?,
            token_ttl_secs: match get("TOKEN_TTL_SECS") {
                Some(raw) => parse("TOKEN_TTL_SECS", &raw)?,
                None => 86_400,
            },
            alphavantage_api_key: required("ALPHAVANTAGE_API_KEY")?,
            quote_api_url: get("QUOTE_API_URL").unwrap_or_else(|| DEFAULT_QUOTE_API_URL.into()),
            starting_cash,
        })
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{} has invalid value {:?}: {}", key, raw, e)))
}
