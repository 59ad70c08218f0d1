//! WAGER-SIM — single-gambler session simulator
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod analytics;
pub mod config;
pub mod engine;
pub mod storage;
pub mod strategy;
pub mod types;
