use crate::config::SignalConfig;
use crate::indicators::IndicatorSnapshot;
use crate::models::*;
use crate::patterns::PatternDetection;

/// Everything a rule may read when scoring the candle at `index`.
pub struct FactorInput<'a> {
    /// Candles up to and including `index`.
    pub candles: &'a [Candle],
    pub index: usize,
    pub snapshot: &'a IndicatorSnapshot,
    pub patterns: &'a PatternDetection,
    pub config: &'a SignalConfig,
}

impl<'a> FactorInput<'a> {
    pub fn current(&self) -> &'a Candle {
        &self.candles[self.index]
    }
}

pub trait FactorRule {
    fn category(&self) -> FactorCategory;
    /// Largest weight this rule can ever assign.
    fn max_weight(&self) -> u32;
    /// `None` when the category cannot be computed for this window.
    fn evaluate(&self, input: &FactorInput<'_>) -> Option<DecisionFactor>;
}

#[path = "factors/pattern.rs"]
pub mod pattern;

pub use pattern::PatternRule;

#[path = "factors/trend.rs"]
pub mod trend;

pub use trend::TrendRule;

#[path = "factors/momentum.rs"]
pub mod momentum;

pub use momentum::MomentumRule;

#[path = "factors/rsi.rs"]
pub mod rsi;

pub use rsi::RsiRule;

#[path = "factors/macd.rs"]
pub mod macd;

pub use macd::MacdRule;

#[path = "factors/volume.rs"]
pub mod volume;

pub use volume::VolumeRule;

#[path = "factors/support_resistance.rs"]
pub mod support_resistance;

pub use support_resistance::SupportResistanceRule;

pub fn default_rules() -> Vec<Box<dyn FactorRule + Send + Sync>> {
    vec![
        Box::new(PatternRule),
        Box::new(TrendRule),
        Box::new(MomentumRule),
        Box::new(RsiRule),
        Box::new(MacdRule),
        Box::new(VolumeRule),
        Box::new(SupportResistanceRule),
    ]
}

/// Populated factors plus the largest total they could have reached.
#[derive(Debug, Clone, Default)]
pub struct FactorEvaluation {
    pub factors: DecisionFactors,
    pub max_total: u32,
}

pub fn evaluate_rules(
    rules: &[Box<dyn FactorRule + Send + Sync>],
    input: &FactorInput<'_>,
) -> FactorEvaluation {
    let mut evaluation = FactorEvaluation::default();
    for rule in rules {
        if let Some(factor) = rule.evaluate(input) {
            evaluation.max_total += rule.max_weight();
            evaluation.factors.insert(rule.category(), factor);
        }
    }
    evaluation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::MacdOutput;
    use crate::patterns;
    use chrono::{Duration, TimeZone, Utc};

    pub(crate) fn candle(offset: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(offset),
            open,
            high,
            low,
            close,
            volume: Some(1_000.0),
        }
    }

    pub(crate) fn snapshot(rsi: f64, histogram: f64, macd_line: f64, ema: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi,
            macd: MacdOutput {
                macd_line,
                signal_line: macd_line - histogram,
                histogram,
            },
            ema,
            atr: 1.0,
            trend: CandleTrend::Bullish,
            volatility: 1.0,
            strength: CandleStrength::Weak,
        }
    }

    #[test]
    fn max_total_counts_only_populated_categories() {
        // Too short for volume and support/resistance windows.
        let candles = vec![
            candle(0, 10.0, 10.5, 9.5, 10.0),
            candle(1, 10.0, 11.0, 9.8, 10.8),
        ];
        let snap = snapshot(50.0, 0.2, 0.3, 10.0);
        let detection = patterns::detect(&candles[1], Some(&candles[0]), &Default::default());
        let config = SignalConfig::default();
        let input = FactorInput {
            candles: &candles,
            index: 1,
            snapshot: &snap,
            patterns: &detection,
            config: &config,
        };

        let evaluation = evaluate_rules(&default_rules(), &input);
        assert!(!evaluation.factors.contains(FactorCategory::VolumeAnalysis));
        assert!(!evaluation.factors.contains(FactorCategory::SupportResistance));
        let expected: u32 = default_rules()
            .iter()
            .filter(|rule| evaluation.factors.contains(rule.category()))
            .map(|rule| rule.max_weight())
            .sum();
        assert_eq!(evaluation.max_total, expected);
        assert_eq!(evaluation.factors.len(), 5);
    }

    #[test]
    fn rules_cover_distinct_categories() {
        let rules = default_rules();
        let mut categories: Vec<_> = rules.iter().map(|rule| rule.category()).collect();
        categories.sort();
        categories.dedup();
        assert_eq!(categories.len(), rules.len());
        assert!(rules.iter().all(|rule| rule.max_weight() > 0));
    }
}
