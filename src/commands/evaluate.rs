use super::load_parameters;
use crate::candle_utils::normalize_symbol;
use crate::config::SignalConfig;
use crate::data_context::{CandleSource, MarketData};
use crate::models::Signal;
use crate::signals::SignalEngine;
use anyhow::{anyhow, Context, Result};
use log::info;
use std::path::Path;

/// Scores the latest candle of `symbol` from the data file.
pub fn evaluate(
    data_path: &Path,
    symbol: &str,
    interval: &str,
    params_path: Option<&Path>,
) -> Result<Signal> {
    let symbol = normalize_symbol(symbol).ok_or_else(|| anyhow!("Symbol must not be blank"))?;
    let parameters = load_parameters(params_path)?;
    let config = SignalConfig::from_parameters(&parameters);
    config.validate().context("Invalid signal configuration")?;

    let data = MarketData::load(data_path, interval)?;
    let candles = data.fetch_candles(&symbol, data.interval(), None)?;
    let engine = SignalEngine::new(config);
    let signal = engine.evaluate(&symbol, data.interval(), &candles);

    info!(
        "{} {} -> {} (confidence {}, total score {})",
        signal.symbol, signal.interval, signal.signal, signal.confidence, signal.total_score
    );
    Ok(signal)
}

pub fn run(
    data_path: &Path,
    symbol: &str,
    interval: &str,
    params_path: Option<&Path>,
) -> Result<()> {
    let signal = evaluate(data_path, symbol, interval, params_path)?;
    let json = serde_json::to_string_pretty(&signal).context("Failed to serialize signal")?;
    println!("{}", json);
    Ok(())
}
