// src/auth.rs
use crate::error::{AppError, Result};
use crate::models::{User, UserId};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    name: String,
    exp: usize,
}

/// Issues and checks the session tokens handed out at login.
#[derive(Clone)]
pub struct TokenKeys {
    secret: String,
    ttl_secs: u64,
}

impl TokenKeys {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        TokenKeys {
            secret: secret.into(),
            ttl_secs,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.username.clone(),
            exp: expiry(Utc::now().timestamp(), self.ttl_secs),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<UserId> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )?;
        data.claims
            .sub
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| AppError::Auth("malformed session token".into()))
    }
}

fn expiry(now: i64, ttl_secs: u64) -> usize {
    let exp = u64::try_from(now).unwrap_or(0).saturating_add(ttl_secs);
    usize::try_from(exp).unwrap_or(usize::MAX)
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}
