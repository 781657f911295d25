use crate::factor_utils::{buy_factor, neutral_factor, sell_factor};
use crate::indicators::support_resistance;
use crate::models::*;

const TOUCH_WEIGHT: u32 = 2;
const BREAKOUT_WEIGHT: u32 = 3;

/// Compares the close with the lowest low and highest high of the preceding
/// window: a break beyond either level follows the break, a close near one
/// of them expects a bounce.
pub struct SupportResistanceRule;

impl super::FactorRule for SupportResistanceRule {
    fn category(&self) -> FactorCategory {
        FactorCategory::SupportResistance
    }

    fn max_weight(&self) -> u32 {
        BREAKOUT_WEIGHT
    }

    fn evaluate(&self, input: &super::FactorInput<'_>) -> Option<DecisionFactor> {
        let lookback = input.config.indicators.support_resistance_lookback;
        let (support, resistance) = support_resistance(input.candles, input.index, lookback)?;
        let close = input.current().close;
        let tolerance = input.config.support_resistance_tolerance;

        if close > resistance {
            return Some(buy_factor(
                BREAKOUT_WEIGHT,
                format!("Breakout above resistance {:.4}", resistance),
            ));
        }
        if close < support {
            return Some(sell_factor(
                BREAKOUT_WEIGHT,
                format!("Breakdown below support {:.4}", support),
            ));
        }

        let near_support = close - support <= support.abs() * tolerance;
        let near_resistance = resistance - close <= resistance.abs() * tolerance;
        let factor = match (near_support, near_resistance) {
            (true, false) => buy_factor(
                TOUCH_WEIGHT,
                format!("Close {:.4} near support {:.4}", close, support),
            ),
            (false, true) => sell_factor(
                TOUCH_WEIGHT,
                format!("Close {:.4} near resistance {:.4}", close, resistance),
            ),
            (true, true) => neutral_factor(format!(
                "Range {:.4}-{:.4} too narrow to separate levels",
                support, resistance
            )),
            (false, false) => neutral_factor(format!(
                "Close {:.4} inside range {:.4}-{:.4}",
                close, support, resistance
            )),
        };
        Some(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{candle, snapshot};
    use super::super::{FactorInput, FactorRule};
    use super::*;
    use crate::config::SignalConfig;
    use crate::patterns::PatternDetection;

    fn run_with_last(last: Candle) -> Option<DecisionFactor> {
        // 20 candles ranging 95..105
        let mut candles: Vec<Candle> = (0..20)
            .map(|i| candle(i, 100.0, 105.0, 95.0, 100.0))
            .collect();
        candles.push(last);
        let config = SignalConfig::default();
        let snap = snapshot(50.0, 0.0, 0.0, 100.0);
        let detection = PatternDetection::default();
        SupportResistanceRule.evaluate(&FactorInput {
            candles: &candles,
            index: candles.len() - 1,
            snapshot: &snap,
            patterns: &detection,
            config: &config,
        })
    }

    #[test]
    fn breakouts_outweigh_touches() {
        let breakout = run_with_last(candle(20, 104.0, 107.0, 103.0, 106.0)).unwrap();
        assert_eq!(breakout.signal, FactorSignal::Buy);
        assert_eq!(breakout.weight, 3);

        let breakdown = run_with_last(candle(20, 96.0, 97.0, 93.0, 94.0)).unwrap();
        assert_eq!(breakdown.signal, FactorSignal::Sell);
        assert_eq!(breakdown.weight, 3);
    }

    #[test]
    fn closes_near_levels_expect_bounce() {
        let at_support = run_with_last(candle(20, 96.5, 97.0, 95.2, 95.5)).unwrap();
        assert_eq!(at_support.signal, FactorSignal::Buy);
        assert_eq!(at_support.weight, 2);

        let at_resistance = run_with_last(candle(20, 103.0, 104.9, 102.0, 104.5)).unwrap();
        assert_eq!(at_resistance.signal, FactorSignal::Sell);
        assert_eq!(at_resistance.weight, 2);

        let middle = run_with_last(candle(20, 99.0, 101.0, 98.0, 100.0)).unwrap();
        assert_eq!(middle.signal, FactorSignal::Neutral);
    }

    #[test]
    fn short_window_is_absent() {
        let candles = vec![candle(0, 1.0, 2.0, 0.5, 1.5)];
        let config = SignalConfig::default();
        let snap = snapshot(50.0, 0.0, 0.0, 1.0);
        let detection = PatternDetection::default();
        let factor = SupportResistanceRule.evaluate(&FactorInput {
            candles: &candles,
            index: 0,
            snapshot: &snap,
            patterns: &detection,
            config: &config,
        });
        assert!(factor.is_none());
    }
}
