use crate::factor_utils::{buy_factor, neutral_factor, sell_factor};
use crate::models::*;

const HISTOGRAM_WEIGHT: u32 = 2;
const LINE_BONUS: u32 = 1;

/// Trend-following vote on the histogram sign; a MACD line on the same side
/// of zero adds a point.
pub struct MacdRule;

impl super::FactorRule for MacdRule {
    fn category(&self) -> FactorCategory {
        FactorCategory::MacdAnalysis
    }

    fn max_weight(&self) -> u32 {
        HISTOGRAM_WEIGHT + LINE_BONUS
    }

    fn evaluate(&self, input: &super::FactorInput<'_>) -> Option<DecisionFactor> {
        let macd = input.snapshot.macd;
        if !macd.histogram.is_finite() || !macd.macd_line.is_finite() {
            return None;
        }

        if macd.histogram > 0.0 {
            let bonus = if macd.macd_line > 0.0 { LINE_BONUS } else { 0 };
            Some(buy_factor(
                HISTOGRAM_WEIGHT + bonus,
                format!(
                    "MACD histogram positive ({:.4}), MACD line {:.4}",
                    macd.histogram, macd.macd_line
                ),
            ))
        } else if macd.histogram < 0.0 {
            let bonus = if macd.macd_line < 0.0 { LINE_BONUS } else { 0 };
            Some(sell_factor(
                HISTOGRAM_WEIGHT + bonus,
                format!(
                    "MACD histogram negative ({:.4}), MACD line {:.4}",
                    macd.histogram, macd.macd_line
                ),
            ))
        } else {
            Some(neutral_factor("MACD histogram flat"))
        }
    }
}
