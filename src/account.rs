// src/account.rs
use crate::auth::{hash_password, verify_password};
use crate::db::{self, Database};
use crate::error::{AppError, Result};
use crate::models::{User, UserId};
use crate::validation::ensure_positive_amount;
use log::{info, warn};
use rust_decimal::Decimal;

/// Registration, login and cash management.
#[derive(Clone)]
pub struct AccountService {
    db: Database,
    starting_cash: Decimal,
}

impl AccountService {
    pub fn new(db: Database, starting_cash: Decimal) -> Self {
        AccountService { db, starting_cash }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User> {
        if username.is_empty() {
            return Err(AppError::Validation("must provide username".into()));
        }
        if password.is_empty() {
            return Err(AppError::Validation("must provide password".into()));
        }
        if password != confirmation {
            return Err(AppError::Validation("passwords must match".into()));
        }

        let hash = hash_password(password)?;
        let cash = self.starting_cash;
        let user = self
            .db
            .transaction(|conn| {
                if db::username_exists(conn, username)? {
                    return Err(AppError::Validation("username taken".into()));
                }
                db::insert_user(conn, username, &hash, cash)
            })
            .await?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let record = self
            .db
            .read(|conn| db::find_user_by_username(conn, username))
            .await?;

        match record {
            Some(record) if verify_password(password, &record.hash)? => {
                info!("User {} logged in", record.user.id);
                Ok(record.user)
            }
            _ => {
                warn!("Failed login for {:?}", username);
                Err(AppError::Auth("invalid username and/or password".into()))
            }
        }
    }

    pub async fn cash(&self, user_id: UserId) -> Result<Decimal> {
        self.db.read(|conn| db::get_cash(conn, user_id)).await
    }

    /// Adds `amount` to the balance and returns the new balance.
    pub async fn deposit(&self, user_id: UserId, amount: i64) -> Result<Decimal> {
        ensure_positive_amount(amount)?;
        let cash = self
            .db
            .transaction(|conn| {
                let cash = db::get_cash(conn, user_id)?
                    .checked_add(Decimal::from(amount))
                    .ok_or_else(|| {
                        AppError::Validation("deposit would overflow the cash balance".into())
                    })?;
                db::set_cash(conn, user_id, cash)?;
                Ok(cash)
            })
            .await?;
        info!("User {} deposited {}, cash now {}", user_id, amount, cash);
        Ok(cash)
    }

    /// Removes `amount` from the balance and returns the new balance.
    pub async fn withdraw(&self, user_id: UserId, amount: i64) -> Result<Decimal> {
        ensure_positive_amount(amount)?;
        let cash = self
            .db
            .transaction(|conn| {
                let available = db::get_cash(conn, user_id)?;
                let amount = Decimal::from(amount);
                if amount > available {
                    return Err(AppError::InsufficientFunds {
                        needed: amount,
                        available,
                    });
                }
                let cash = available - amount;
                db::set_cash(conn, user_id, cash)?;
                Ok(cash)
            })
            .await?;
        info!("User {} withdrew {}, cash now {}", user_id, amount, cash);
        Ok(cash)
    }
}
