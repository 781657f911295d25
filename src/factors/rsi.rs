use crate::factor_utils::{buy_factor, neutral_factor, sell_factor};
use crate::models::*;

const MAX_WEIGHT: u32 = 4;

pub struct RsiRule;

/// One point for crossing the threshold plus one per started 10 RSI points beyond it.
fn distance_weight(distance: f64) -> u32 {
    let steps = (distance / 10.0).ceil().max(0.0) as u32;
    (1 + steps).min(MAX_WEIGHT)
}

impl super::FactorRule for RsiRule {
    fn category(&self) -> FactorCategory {
        FactorCategory::RsiAnalysis
    }

    fn max_weight(&self) -> u32 {
        MAX_WEIGHT
    }

    fn evaluate(&self, input: &super::FactorInput<'_>) -> Option<DecisionFactor> {
        let rsi = input.snapshot.rsi;
        if !rsi.is_finite() {
            return None;
        }
        let oversold = input.config.rsi_oversold;
        let overbought = input.config.rsi_overbought;

        // Buy signal: RSI is oversold
        if rsi < oversold {
            return Some(buy_factor(
                distance_weight(oversold - rsi),
                format!("RSI {:.2} below oversold level {:.0}", rsi, oversold),
            ));
        }

        // Sell signal: RSI is overbought
        if rsi > overbought {
            return Some(sell_factor(
                distance_weight(rsi - overbought),
                format!("RSI {:.2} above overbought level {:.0}", rsi, overbought),
            ));
        }

        Some(neutral_factor(format!("RSI {:.2} in neutral zone", rsi)))
    }
}
