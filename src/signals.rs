use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::candle_utils::sanitize_candles;
use crate::config::SignalConfig;
use crate::error::IndicatorError;
use crate::factor_utils::{meets_confidence_threshold, neutral_factor, normalized_confidence};
use crate::factors::{default_rules, evaluate_rules, FactorInput, FactorRule};
use crate::indicators;
use crate::models::*;
use crate::patterns;
use crate::trading_rules::risk_levels;

/// Scores the latest candle of a window into a BUY/SELL/HOLD decision.
pub struct SignalEngine {
    config: SignalConfig,
    rules: Vec<Box<dyn FactorRule + Send + Sync>>,
}

impl SignalEngine {
    pub fn new(config: SignalConfig) -> Self {
        Self {
            config,
            rules: default_rules(),
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Candles needed before a decision is attempted.
    pub fn min_lookback(&self) -> usize {
        self.config.indicators.min_lookback()
    }

    /// Evaluates the last candle. Malformed candles are dropped first.
    pub fn evaluate(&self, symbol: &str, interval: &str, candles: &[Candle]) -> Signal {
        let (valid, rejected) = sanitize_candles(candles);
        if !rejected.is_empty() {
            warn!(
                "Dropped {} malformed candle(s) while evaluating {} {}",
                rejected.len(),
                symbol,
                interval
            );
        }
        match valid.len().checked_sub(1) {
            Some(index) => self.evaluate_at(symbol, interval, &valid, index),
            None => insufficient_signal(
                symbol,
                interval,
                None,
                IndicatorError::InsufficientData {
                    indicator: "indicator set",
                    required: self.min_lookback(),
                    available: 0,
                },
            ),
        }
    }

    /// Evaluates the candle at `index` using only `candles[..=index]`.
    ///
    /// # Preconditions
    ///
    /// `candles` must already be sanitized: valid candles with strictly
    /// increasing timestamps. Ordering is not re-checked here, so an unsorted
    /// series lets later candles leak into the indicators. Use
    /// [`SignalEngine::evaluate`] for raw input.
    pub(crate) fn evaluate_at(
        &self,
        symbol: &str,
        interval: &str,
        candles: &[Candle],
        index: usize,
    ) -> Signal {
        let Some(current) = candles.get(index) else {
            return insufficient_signal(
                symbol,
                interval,
                candles.last(),
                IndicatorError::InsufficientData {
                    indicator: "indicator set",
                    required: self.min_lookback(),
                    available: candles.len(),
                },
            );
        };
        let window = &candles[..=index];

        let snapshot = match indicators::compute(window, index, &self.config.indicators) {
            Ok(snapshot) => snapshot,
            Err(err) => return insufficient_signal(symbol, interval, Some(current), err),
        };

        let previous = index.checked_sub(1).map(|i| &window[i]);
        let detection = patterns::detect(current, previous, &self.config.patterns);

        let evaluation = evaluate_rules(
            &self.rules,
            &FactorInput {
                candles: window,
                index,
                snapshot: &snapshot,
                patterns: &detection,
                config: &self.config,
            },
        );

        let net = evaluation.factors.net_direction();
        let total_score = agreeing_score(&evaluation.factors, net);
        let confidence = normalized_confidence(total_score, evaluation.max_total);

        let direction = if net > 0 {
            Some(TradeDirection::Buy)
        } else if net < 0 {
            Some(TradeDirection::Sell)
        } else {
            None
        };

        let entry_price = current.close;
        let levels = direction
            .filter(|_| meets_confidence_threshold(confidence, self.config.min_confidence))
            .and_then(|dir| {
                risk_levels(&self.config.risk, entry_price, Some(snapshot.atr), dir)
                    .map(|levels| (dir, levels))
            });

        let (action, stop_loss, take_profit) = match levels {
            Some((dir, levels)) => (dir.as_action(), levels.stop_loss, levels.take_profit),
            None => (SignalAction::Hold, entry_price, entry_price),
        };

        debug!(
            "{} {} @ {}: {} net={} total={} confidence={}",
            symbol, interval, current.timestamp, action, net, total_score, confidence
        );

        Signal {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            signal: action,
            entry_price,
            current_price: current.close,
            stop_loss,
            take_profit,
            pattern: detection.pattern,
            score: detection.score,
            trend: Some(snapshot.trend),
            confidence,
            timestamp: current.timestamp,
            decision_factors: evaluation.factors,
            total_score,
        }
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(SignalConfig::default())
    }
}

/// Sum of the weights voting with the sign of `net`; zero when undecided.
fn agreeing_score(factors: &DecisionFactors, net: i64) -> u32 {
    if net == 0 {
        return 0;
    }
    factors
        .iter()
        .filter(|(_, factor)| factor.signal.sign() == net.signum())
        .map(|(_, factor)| factor.weight)
        .sum()
}

fn insufficient_signal(
    symbol: &str,
    interval: &str,
    current: Option<&Candle>,
    err: IndicatorError,
) -> Signal {
    let price = current.map(|c| c.close).unwrap_or(0.0);
    let timestamp: DateTime<Utc> = current
        .map(|c| c.timestamp)
        .unwrap_or_default();

    let mut decision_factors = DecisionFactors::new();
    decision_factors.insert(FactorCategory::InsufficientData, neutral_factor(err.to_string()));

    Signal {
        symbol: symbol.to_string(),
        interval: interval.to_string(),
        signal: SignalAction::Hold,
        entry_price: price,
        current_price: price,
        stop_loss: price,
        take_profit: price,
        pattern: None,
        score: 0,
        trend: current.map(indicators::candle_trend),
        confidence: 0,
        timestamp,
        decision_factors,
        total_score: 0,
    }
}
