//! Core domain types and logic: indicators, signals, and the simulation.

pub mod ohlcv;
pub mod position;
pub mod indicator;
pub mod indicator_helpers;
pub mod signal;
pub mod simulation;
pub mod backtest;
pub mod sweep;
pub mod universe;
pub mod config_validation;
pub mod error;
