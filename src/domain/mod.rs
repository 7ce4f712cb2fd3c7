//! Core domain types and logic.

pub mod backtest;
pub mod config;
pub mod config_validation;
pub mod daily_risk;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod ledger;
pub mod metrics;
pub mod ohlcv;
pub mod position;
pub mod position_manager;
pub mod signal;
