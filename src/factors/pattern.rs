use crate::factor_utils::{directional_factor, neutral_factor};
use crate::models::*;
use crate::patterns::PatternKind;

pub struct PatternRule;

impl super::FactorRule for PatternRule {
    fn category(&self) -> FactorCategory {
        FactorCategory::CandlestickPattern
    }

    fn max_weight(&self) -> u32 {
        PatternKind::MAX_COMBINED_WEIGHT
    }

    fn evaluate(&self, input: &super::FactorInput<'_>) -> Option<DecisionFactor> {
        let detection = input.patterns;
        let Some(pattern) = detection.pattern else {
            return Some(neutral_factor("No candlestick pattern detected"));
        };

        let matched: Vec<&str> = detection.matched.iter().map(|kind| kind.name()).collect();
        let reasoning = format!(
            "{} detected (score {} from {})",
            pattern,
            detection.score,
            matched.join(", ")
        );
        Some(directional_factor(
            pattern.factor_signal(),
            detection.score,
            reasoning,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{candle, snapshot};
    use super::super::{FactorInput, FactorRule};
    use super::*;
    use crate::config::SignalConfig;
    use crate::patterns;

    fn run(candles: &[Candle]) -> DecisionFactor {
        let config = SignalConfig::default();
        let index = candles.len() - 1;
        let previous = index.checked_sub(1).map(|i| &candles[i]);
        let detection = patterns::detect(&candles[index], previous, &config.patterns);
        let snap = snapshot(50.0, 0.0, 0.0, candles[index].close);
        PatternRule
            .evaluate(&FactorInput {
                candles,
                index,
                snapshot: &snap,
                patterns: &detection,
                config: &config,
            })
            .unwrap()
    }

    #[test]
    fn engulfing_votes_with_pattern_score() {
        let candles = vec![
            candle(0, 10.0, 10.1, 8.9, 9.0),
            candle(1, 8.9, 10.3, 8.8, 10.2),
        ];
        let factor = run(&candles);
        assert_eq!(factor.signal, FactorSignal::Buy);
        assert!(factor.weight >= 4);
        assert!(factor.reasoning.contains("Bullish Engulfing"));
    }

    #[test]
    fn doji_is_neutral() {
        let factor = run(&[candle(0, 10.0, 15.0, 9.0, 10.5)]);
        assert_eq!(factor.signal, FactorSignal::Neutral);
        assert_eq!(factor.weight, 0);
    }
}
