use crate::candle_utils::{sanitize_candles, window_bounds};
use crate::config::BacktestConfig;
use crate::data_context::CandleSource;
use crate::factor_utils::meets_confidence_threshold;
use crate::models::{BacktestSummary, BacktestTrade, Candle, TradeOutcome};
use crate::performance::PerformanceCalculator;
use crate::signals::SignalEngine;
use crate::simulator::{TradePlan, TradeSimulator};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative stop flag shared between a caller and running backtests.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Replays history candle by candle through the signal engine and simulates
/// every trade it would have taken.
pub struct BacktestRunner {
    engine: SignalEngine,
    simulator: TradeSimulator,
    min_confidence: u32,
}

impl BacktestRunner {
    /// The runner's `min_confidence` is the only threshold applied; it replaces
    /// whatever the nested signal config carries.
    pub fn new(config: BacktestConfig) -> Self {
        let mut signal = config.signal;
        signal.min_confidence = config.min_confidence;
        Self {
            simulator: TradeSimulator::new(config.intrabar_policy, config.position_size_usd),
            min_confidence: config.min_confidence,
            engine: SignalEngine::new(signal),
        }
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }

    /// Backtests one symbol over the candles whose timestamps fall inside
    /// `[start, end]`. Candles before `start` still feed the indicators;
    /// nothing after `end` is ever read.
    pub fn run(
        &self,
        symbol: &str,
        interval: &str,
        candles: &[Candle],
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> BacktestSummary {
        let (valid, rejected) = sanitize_candles(candles);
        let rejected_candles = rejected.len() as u32;

        let Some((first, last)) = window_bounds(&valid, start, end) else {
            info!("No candles for {} {} inside the backtest window", symbol, interval);
            let mut summary = PerformanceCalculator::summarize(Vec::new(), rejected_candles, false);
            summary.symbol_profit.insert(symbol.to_string(), 0.0);
            return summary;
        };

        info!(
            "Backtesting {} {} over {} candles ({} -> {})",
            symbol,
            interval,
            last - first + 1,
            valid[first].timestamp,
            valid[last].timestamp
        );

        let mut trades = Vec::new();
        let mut truncated = false;
        let mut next_entry = first;

        for index in first..=last {
            if cancel.is_cancelled() {
                truncated = true;
                info!(
                    "Backtest for {} cancelled at {}; returning partial results",
                    symbol, valid[index].timestamp
                );
                break;
            }
            if index < next_entry {
                continue;
            }

            let signal = self.engine.evaluate_at(symbol, interval, &valid, index);
            if !signal.is_actionable()
                || !meets_confidence_threshold(signal.confidence, self.min_confidence)
            {
                continue;
            }
            let Some(plan) = TradePlan::from_signal(&signal) else {
                continue;
            };

            let forward = &valid[index + 1..=last];
            let result = self.simulator.simulate(&plan, forward);
            debug!(
                "{} {} entry at {} -> {} after {} bars",
                symbol,
                signal.signal,
                signal.timestamp,
                result.result.as_str(),
                result.bars_held
            );

            let still_open = matches!(result.result, TradeOutcome::Open);
            next_entry = index + result.bars_held + 1;
            trades.push(BacktestTrade {
                symbol: symbol.to_string(),
                entry_time: signal.timestamp,
                confidence: signal.confidence,
                pattern: signal.pattern,
                trade: result,
            });

            if still_open {
                break;
            }
        }

        let mut summary = PerformanceCalculator::summarize(trades, rejected_candles, truncated);
        summary.symbol_profit.entry(symbol.to_string()).or_insert(0.0);
        info!(
            "{}: {} trades, win rate {:.1}%, profit {:.2} USD",
            symbol, summary.total_trades, summary.win_rate, summary.total_profit_usd
        );
        summary
    }

    /// Runs every symbol in parallel and merges the results. Symbols whose
    /// candles cannot be fetched are skipped with a warning.
    pub fn run_many(
        &self,
        source: &dyn CandleSource,
        symbols: &[String],
        interval: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
        progress: &ProgressBar,
    ) -> BacktestSummary {
        let started = Instant::now();
        let summaries: Vec<BacktestSummary> = symbols
            .par_iter()
            .filter_map(|symbol| {
                let summary = match source.fetch_candles(symbol, interval, None) {
                    Ok(candles) => Some(self.run(symbol, interval, &candles, start, end, cancel)),
                    Err(err) => {
                        warn!("Skipping {}: {:#}", symbol, err);
                        None
                    }
                };
                progress.inc(1);
                summary
            })
            .collect();
        progress.finish_and_clear();

        let merged = PerformanceCalculator::merge(summaries);
        info!(
            "Backtested {} symbol(s) in {:.2}s: {} trades, total profit {:.2} USD{}",
            merged.symbol_profit.len(),
            started.elapsed().as_secs_f64(),
            merged.total_trades,
            merged.total_profit_usd,
            if merged.truncated { " (truncated)" } else { "" }
        );
        merged
    }
}

impl Default for BacktestRunner {
    fn default() -> Self {
        Self::new(BacktestConfig::default())
    }
}
