// src/lib.rs
pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod portfolio;
pub mod quote;
pub mod state;
pub mod validation;
