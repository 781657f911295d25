use crate::factor_utils::{buy_factor, neutral_factor, sell_factor};
use crate::models::*;

const STRONG_BODY_WEIGHT: u32 = 2;

pub struct MomentumRule;

impl super::FactorRule for MomentumRule {
    fn category(&self) -> FactorCategory {
        FactorCategory::MomentumStrength
    }

    fn max_weight(&self) -> u32 {
        STRONG_BODY_WEIGHT
    }

    fn evaluate(&self, input: &super::FactorInput<'_>) -> Option<DecisionFactor> {
        let current = input.current();
        let snapshot = input.snapshot;
        if snapshot.strength == CandleStrength::Weak {
            return Some(neutral_factor(format!(
                "Weak candle body ({:.2}% volatility)",
                snapshot.volatility
            )));
        }

        let factor = if current.is_bullish() {
            buy_factor(STRONG_BODY_WEIGHT, "Strong bullish body")
        } else if current.is_bearish() {
            sell_factor(STRONG_BODY_WEIGHT, "Strong bearish body")
        } else {
            neutral_factor("Strong range without a body")
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
    use crate::indicators::candle_strength;
    use crate::patterns::PatternDetection;

    fn run(current: Candle) -> DecisionFactor {
        let config = SignalConfig::default();
        let mut snap = snapshot(50.0, 0.0, 0.0, current.close);
        snap.strength = candle_strength(&current, config.indicators.strong_body_ratio);
        let detection = PatternDetection::default();
        MomentumRule
            .evaluate(&FactorInput {
                candles: &[current],
                index: 0,
                snapshot: &snap,
                patterns: &detection,
                config: &config,
            })
            .unwrap()
    }

    #[test]
    fn strong_bodies_follow_candle_direction() {
        assert_eq!(
            run(candle(0, 10.0, 11.1, 9.9, 11.0)).signal,
            FactorSignal::Buy
        );
        let down = run(candle(0, 11.0, 11.1, 9.9, 10.0));
        assert_eq!(down.signal, FactorSignal::Sell);
        assert_eq!(down.weight, 2);
    }

    #[test]
    fn weak_body_is_neutral() {
        let factor = run(candle(0, 10.0, 12.0, 8.0, 10.5));
        assert_eq!(factor.signal, FactorSignal::Neutral);
        assert_eq!(factor.weight, 0);
    }
}
