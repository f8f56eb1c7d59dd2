// src/state.rs
use crate::account::AccountService;
use crate::auth::TokenKeys;
use crate::db::Database;
use crate::portfolio::PortfolioService;
use crate::quote::QuoteProvider;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Everything a request handler needs, shared across requests.
pub struct AppState {
    pub accounts: AccountService,
    pub portfolio: PortfolioService,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(
        db: Database,
        quotes: Arc<dyn QuoteProvider>,
        tokens: TokenKeys,
        starting_cash: Decimal,
    ) -> Self {
        AppState {
            accounts: AccountService::new(db.clone(), starting_cash),
            portfolio: PortfolioService::new(db, quotes),
            tokens,
        }
    }
}
