// src/quote.rs
use crate::error::{AppError, Result};
use crate::models::Quote;
use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;

/// Source of live stock quotes.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Returns `Ok(None)` when the symbol does not exist.
    async fn lookup(&self, symbol: &str) -> Result<Option<Quote>>;
}

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
}

#[derive(Deserialize)]
struct SymbolSearchResponse {
    #[serde(rename = "bestMatches", default)]
    best_matches: Vec<SymbolMatch>,
}

#[derive(Deserialize)]
struct SymbolMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name")]
    name: String,
}

/// Quotes from Alpha Vantage: `GLOBAL_QUOTE` for the price and
/// `SYMBOL_SEARCH` for the company name.
pub struct AlphaVantageProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        AlphaVantageProvider {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn company_name(&self, symbol: &str) -> Option<String> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "SYMBOL_SEARCH"),
                ("keywords", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let parsed = match response {
            Ok(r) => r.json::<SymbolSearchResponse>().await,
            Err(e) => Err(e),
        };
        match parsed {
            Ok(search) => search
                .best_matches
                .into_iter()
                .find(|m| m.symbol.eq_ignore_ascii_case(symbol))
                .map(|m| m.name),
            Err(e) => {
                warn!("Name lookup for {} failed: {}", symbol, e);
                None
            }
        }
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    async fn lookup(&self, symbol: &str) -> Result<Option<Quote>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            error!("Quote request for {} failed: HTTP {}", symbol, response.status());
            return Err(AppError::QuoteProvider(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body = response.json::<GlobalQuoteResponse>().await?;
        let (symbol, price) = match parse_global_quote(body)? {
            Some(found) => found,
            None => {
                debug!("No quote for {}", symbol);
                return Ok(None);
            }
        };

        let name = self
            .company_name(&symbol)
            .await
            .unwrap_or_else(|| symbol.clone());
        Ok(Some(Quote {
            symbol,
            name,
            price,
        }))
    }
}

/// Extracts `(symbol, price)` from a `GLOBAL_QUOTE` body. Throttling and API
/// errors are provider failures; an empty quote means the symbol is unknown.
fn parse_global_quote(body: GlobalQuoteResponse) -> Result<Option<(String, Decimal)>> {
    if let Some(msg) = body.note.or(body.information) {
        warn!("Quote provider refused request: {}", msg);
        return Err(AppError::QuoteProvider(msg));
    }
    if body.error_message.is_some() {
        return Ok(None);
    }
    let Some(GlobalQuote {
        symbol: Some(symbol),
        price: Some(price),
    }) = body.global_quote
    else {
        return Ok(None);
    };

    let price = Decimal::from_str(price.trim())
        .map_err(|e| AppError::QuoteProvider(format!("bad price {:?}: {}", price, e)))?;
    if price <= Decimal::ZERO {
        return Ok(None);
    }
    Ok(Some((symbol.trim().to_uppercase(), price)))
}

/// In-process quote table with prices set by hand.
#[derive(Default)]
pub struct StaticQuoteProvider {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl StaticQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, symbol: &str, name: &str, price: Decimal) {
        let symbol = symbol.to_uppercase();
        let mut quotes = self.quotes.write().unwrap_or_else(|e| e.into_inner());
        quotes.insert(
            symbol.clone(),
            Quote {
                symbol,
                name: name.to_string(),
                price,
            },
        );
    }

    pub fn remove(&self, symbol: &str) {
        let mut quotes = self.quotes.write().unwrap_or_else(|e| e.into_inner());
        quotes.remove(&symbol.to_uppercase());
    }
}

#[async_trait]
impl QuoteProvider for StaticQuoteProvider {
    async fn lookup(&self, symbol: &str) -> Result<Option<Quote>> {
        let quotes = self.quotes.read().unwrap_or_else(|e| e.into_inner());
        Ok(quotes.get(&symbol.to_uppercase()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(json: &str) -> Result<Option<(String, Decimal)>> {
        parse_global_quote(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn global_quote_is_parsed_exactly() {
        let quote = parse(
            r#"{"Global Quote": {"01. symbol": "ibm", "02. open": "1.0", "05. price": "187.4300"}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(quote, ("IBM".to_string(), dec!(187.43)));
    }

    #[test]
    fn empty_quote_means_unknown_symbol() {
        assert!(parse(r#"{"Global Quote": {}}"#).unwrap().is_none());
        assert!(parse(r#"{"Error Message": "Invalid API call."}"#).unwrap().is_none());
        assert!(
            parse(r#"{"Global Quote": {"01. symbol": "X", "05. price": "0.0000"}}"#)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn throttling_is_a_provider_error() {
        let err = parse(r#"{"Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."}"#)
            .unwrap_err();
        assert!(matches!(err, AppError::QuoteProvider(_)));
    }

    #[tokio::test]
    async fn static_provider_is_case_insensitive() {
        let quotes = StaticQuoteProvider::new();
        quotes.set_price("aapl", "Apple Inc.", dec!(50));
        let quote = quotes.lookup("AAPL").await.unwrap().unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, dec!(50));

        quotes.remove("AAPL");
        assert!(quotes.lookup("aapl").await.unwrap().is_none());
    }
}
