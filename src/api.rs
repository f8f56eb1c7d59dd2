// src/api.rs
use crate::auth::TokenKeys;
use crate::error::{AppError, ErrorResponse};
use crate::models::{usd, User, UserId};
use crate::state::AppState;
use crate::validation::{
    CashDirection, LoginForm, ManageForm, QuoteForm, RegisterForm, TradeForm,
};
use log::{error, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

#[derive(Serialize)]
struct QuoteResponse {
    symbol: String,
    name: String,
    price: Decimal,
    price_display: String,
}

#[derive(Serialize)]
struct CashResponse {
    direction: &'static str,
    amount: i64,
    cash: Decimal,
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let tokens = state.tokens.clone();

    let register = warp::path!("register")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(register_handler);

    let login = warp::path!("login")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(login_handler);

    let index = warp::path::end()
        .and(warp::get())
        .and(with_user(tokens.clone()))
        .and(with_state(state.clone()))
        .and_then(index_handler);

    let quote = warp::path!("quote")
        .and(warp::post())
        .and(with_user(tokens.clone()))
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(quote_handler);

    let buy = warp::path!("buy")
        .and(warp::post())
        .and(with_user(tokens.clone()))
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(buy_handler);

    let sell = warp::path!("sell")
        .and(warp::post())
        .and(with_user(tokens.clone()))
        .and(with_state(state.clone()))
        .and(warp::body::form())
        .and_then(sell_handler);

    let history = warp::path!("history")
        .and(warp::get())
        .and(with_user(tokens.clone()))
        .and(with_state(state.clone()))
        .and_then(history_handler);

    let manage = warp::path!("manage")
        .and(warp::post())
        .and(with_user(tokens))
        .and(with_state(state))
        .and(warp::body::form())
        .and_then(manage_handler);

    register
        .or(login)
        .or(index)
        .or(quote)
        .or(buy)
        .or(sell)
        .or(history)
        .or(manage)
        .recover(handle_rejection)
        .with(warp::reply::with::header(
            "Cache-Control",
            "no-cache, no-store, must-revalidate",
        ))
        .with(warp::reply::with::header("Expires", "0"))
        .with(warp::reply::with::header("Pragma", "no-cache"))
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Resolves the `Authorization: Bearer` header to the caller's identity.
fn with_user(tokens: TokenKeys) -> impl Filter<Extract = (UserId,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let result = authorize(&tokens, header);
        async move { result.map_err(reject) }
    })
}

fn authorize(tokens: &TokenKeys, header: Option<String>) -> Result<UserId, AppError> {
    let header = header.ok_or_else(|| AppError::Auth("login required".into()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("malformed Authorization header".into()))?;
    tokens.verify(token.trim())
}

fn reject(e: AppError) -> Rejection {
    if e.is_user_error() {
        warn!("Request rejected: {}", e);
    } else {
        error!("Request failed: {}", e);
    }
    warp::reject::custom(e)
}

async fn register_handler(
    state: Arc<AppState>,
    form: RegisterForm,
) -> Result<impl Reply, Rejection> {
    let req = form.validate().map_err(reject)?;
    let user = state
        .accounts
        .register(&req.username, &req.password, &req.confirmation)
        .await
        .map_err(reject)?;
    Ok(warp::reply::with_status(
        warp::reply::json(&user),
        StatusCode::CREATED,
    ))
}

async fn login_handler(state: Arc<AppState>, form: LoginForm) -> Result<impl Reply, Rejection> {
    let req = form.validate().map_err(reject)?;
    match state.accounts.authenticate(&req.username, &req.password).await {
        Ok(user) => {
            let token = state.tokens.issue(&user).map_err(reject)?;
            Ok(warp::reply::json(&LoginResponse { token, user }))
        }
        Err(e) => Err(reject(e)),
    }
}

async fn index_handler(user_id: UserId, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    match state.portfolio.summary(user_id).await {
        Ok(summary) => Ok(warp::reply::json(&summary)),
        Err(e) => {
            error!("Failed to build portfolio for user {}: {}", user_id, e);
            Err(warp::reject::custom(e))
        }
    }
}

async fn quote_handler(
    _user_id: UserId,
    state: Arc<AppState>,
    form: QuoteForm,
) -> Result<impl Reply, Rejection> {
    let symbol = form.validate().map_err(reject)?;
    let quote = state.portfolio.quote(&symbol).await.map_err(reject)?;
    Ok(warp::reply::json(&QuoteResponse {
        price_display: usd(quote.price),
        symbol: quote.symbol,
        name: quote.name,
        price: quote.price,
    }))
}

async fn buy_handler(
    user_id: UserId,
    state: Arc<AppState>,
    form: TradeForm,
) -> Result<impl Reply, Rejection> {
    let req = form.validate().map_err(reject)?;
    let receipt = state
        .portfolio
        .buy(user_id, &req.symbol, req.shares)
        .await
        .map_err(reject)?;
    info!("Bought!");
    Ok(warp::reply::json(&receipt))
}

async fn sell_handler(
    user_id: UserId,
    state: Arc<AppState>,
    form: TradeForm,
) -> Result<impl Reply, Rejection> {
    let req = form.validate().map_err(reject)?;
    let receipt = state
        .portfolio
        .sell(user_id, &req.symbol, req.shares)
        .await
        .map_err(reject)?;
    info!("Sold!");
    Ok(warp::reply::json(&receipt))
}

async fn history_handler(user_id: UserId, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let history = state.portfolio.history(user_id).await.map_err(reject)?;
    Ok(warp::reply::json(&history))
}

async fn manage_handler(
    user_id: UserId,
    state: Arc<AppState>,
    form: ManageForm,
) -> Result<impl Reply, Rejection> {
    let req = form.validate().map_err(reject)?;
    let cash = match req.direction {
        CashDirection::Deposit => state.accounts.deposit(user_id, req.amount).await,
        CashDirection::Withdraw => state.accounts.withdraw(user_id, req.amount).await,
    }
    .map_err(reject)?;
    Ok(warp::reply::json(&CashResponse {
        direction: req.direction.as_str(),
        amount: req.amount,
        cash,
    }))
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(e) = err.find::<AppError>() {
        (e.status(), ErrorResponse::from(e))
    } else if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            ErrorResponse {
                code: "NOT_FOUND".into(),
                message: "no such route".into(),
            },
        )
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            ErrorResponse {
                code: "VALIDATION_ERROR".into(),
                message: e.to_string(),
            },
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorResponse {
                code: "METHOD_NOT_ALLOWED".into(),
                message: "method not allowed".into(),
            },
        )
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorResponse {
                code: "UNSUPPORTED_MEDIA_TYPE".into(),
                message: "expected a form-encoded body".into(),
            },
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse {
                code: "INTERNAL_ERROR".into(),
                message: "internal server error".into(),
            },
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
