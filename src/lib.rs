//! Fairline Library
//!
//! Fair odds, expected value and exchange posting prices for two-way
//! sportsbook markets

pub mod config;
pub mod error;
pub mod odds;
pub mod persistence;
pub mod scanner;
pub mod types;
