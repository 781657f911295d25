pub mod backtester;
pub mod candle_utils;
pub mod commands;
pub mod config;
pub mod data_context;
pub mod error;
pub mod factor_utils;
pub mod factors;
pub mod indicators;
pub mod models;
pub mod param_utils;
pub mod patterns;
pub mod performance;
pub mod signals;
pub mod simulator;
pub mod trading_rules;
