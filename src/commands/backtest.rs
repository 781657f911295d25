use super::load_parameters;
use crate::backtester::{BacktestRunner, CancellationToken};
use crate::candle_utils::normalize_symbol;
use crate::config::BacktestConfig;
use crate::data_context::MarketData;
use crate::models::BacktestSummary;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;

/// Inputs of the `backtest` subcommand. Explicit flags override the same
/// keys in the parameter file.
#[derive(Debug, Clone, Default)]
pub struct BacktestOptions {
    pub data: PathBuf,
    pub symbols: Vec<String>,
    pub interval: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub min_confidence: Option<u32>,
    pub position_size: Option<f64>,
    pub optimistic: bool,
    pub params: Option<PathBuf>,
    pub show_progress: bool,
}

pub fn backtest(options: &BacktestOptions) -> Result<BacktestSummary> {
    if let (Some(start), Some(end)) = (options.start, options.end) {
        if start > end {
            return Err(anyhow!("Start date {} is after end date {}", start, end));
        }
    }

    let mut parameters = load_parameters(options.params.as_deref())?;
    if let Some(min_confidence) = options.min_confidence {
        parameters.insert("minConfidence".to_string(), min_confidence as f64);
    }
    if let Some(position_size) = options.position_size {
        parameters.insert("positionSize".to_string(), position_size);
    }
    if options.optimistic {
        parameters.insert("optimistic".to_string(), 1.0);
    }
    let config = BacktestConfig::from_parameters(&parameters);
    config.validate().context("Invalid backtest configuration")?;

    let data = MarketData::load(&options.data, &options.interval)?;
    let symbols: Vec<String> = if options.symbols.is_empty() {
        data.symbols().to_vec()
    } else {
        options
            .symbols
            .iter()
            .filter_map(|symbol| normalize_symbol(symbol))
            .collect()
    };
    if symbols.is_empty() {
        return Err(anyhow!("No symbols selected for backtest"));
    }

    info!(
        "Backtesting {} symbol(s) on the {} interval (min confidence {}, position size {:.2} USD, {} intrabar policy)",
        symbols.len(),
        data.interval(),
        config.min_confidence,
        config.position_size_usd,
        config.intrabar_policy.label()
    );

    let progress = if options.show_progress {
        let pb = ProgressBar::new(symbols.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let runner = BacktestRunner::new(config);
    Ok(runner.run_many(
        &data,
        &symbols,
        data.interval(),
        options.start,
        options.end,
        &CancellationToken::new(),
        &progress,
    ))
}

pub fn run(options: &BacktestOptions) -> Result<()> {
    let summary = backtest(options)?;
    let json =
        serde_json::to_string_pretty(&summary).context("Failed to serialize backtest summary")?;
    println!("{}", json);
    Ok(())
}
