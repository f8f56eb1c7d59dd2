// src/main.rs
use dotenv::dotenv;
use env_logger::{Builder, Env};
use log::{error, info};
use reqwest::Client;
use std::sync::Arc;
use stock_trader::api;
use stock_trader::auth::TokenKeys;
use stock_trader::config::Config;
use stock_trader::db::Database;
use stock_trader::quote::AlphaVantageProvider;
use stock_trader::state::AppState;
use warp::Filter;

#[tokio::main]
async fn main() {
    dotenv().ok();
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return;
        }
    };

    let db = match Database::open(&config.database_path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };
    info!("Connected to database...");

    let quotes = Arc::new(AlphaVantageProvider::new(
        Client::new(),
        config.quote_api_url.clone(),
        config.alphavantage_api_key.clone(),
    ));
    let tokens = TokenKeys::new(config.jwt_secret.clone(), config.token_ttl_secs);
    let state = Arc::new(AppState::new(db, quotes, tokens, config.starting_cash));

    let api = api::routes(state).with(warp::log("stock_trader"));

    info!("Server running on http://{}", config.bind_addr);
    warp::serve(api).run(config.bind_addr).await;
}
