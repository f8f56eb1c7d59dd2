// src/error.rs
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("Symbol {0} doesn't exist")]
    UnknownSymbol(String),

    #[error("{0}")]
    InvalidQuantity(String),

    #[error("Not enough cash: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("Not enough shares of {symbol}: requested {requested}, own {owned}")]
    InsufficientShares {
        symbol: String,
        requested: i64,
        owned: i64,
    },

    #[error("Stock {0} not owned")]
    NotOwned(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Quote provider error: {0}")]
    QuoteProvider(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(_) | AppError::Token(_) => "AUTH_ERROR",
            AppError::UnknownSymbol(_) => "UNKNOWN_SYMBOL",
            AppError::InvalidQuantity(_) => "INVALID_QUANTITY",
            AppError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            AppError::InsufficientShares { .. } => "INSUFFICIENT_SHARES",
            AppError::NotOwned(_) => "NOT_OWNED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Http(_) | AppError::QuoteProvider(_) => "QUOTE_PROVIDER_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::UnknownSymbol(_)
            | AppError::InvalidQuantity(_)
            | AppError::InsufficientFunds { .. }
            | AppError::InsufficientShares { .. }
            | AppError::NotOwned(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) | AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Http(_) | AppError::QuoteProvider(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the error was caused by the request rather than by the server.
    pub fn is_user_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl Reject for AppError {}

/// Body of every rejected request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        // Token failures get a fixed message rather than the decoder's detail.
        let message = match err {
            AppError::Token(_) => "invalid or expired session".to_string(),
            e if e.is_user_error() => e.to_string(),
            AppError::Http(_) | AppError::QuoteProvider(_) => {
                "quote service unavailable".to_string()
            }
            _ => "internal server error".to_string(),
        };
        ErrorResponse {
            code: err.code().to_string(),
            message,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn user_errors_keep_their_message() {
        let err = AppError::InsufficientFunds {
            needed: dec!(500),
            available: dec!(120.50),
        };
        let body = ErrorResponse::from(&err);
        assert_eq!(body.code, "INSUFFICIENT_FUNDS");
        assert_eq!(body.message, "Not enough cash: need 500, have 120.50");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn server_errors_hide_details() {
        let err = AppError::Internal("mutex poisoned".into());
        let body = ErrorResponse::from(&err);
        assert_eq!(body.message, "internal server error");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_maps_to_unauthorized() {
        assert_eq!(
            AppError::Auth("invalid username and/or password".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
