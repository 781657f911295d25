use crate::factor_utils::{buy_factor, neutral_factor, sell_factor};
use crate::models::*;

const BASE_WEIGHT: u32 = 2;
const AGREEMENT_BONUS: u32 = 1;

/// Close against the EMA, strengthened when the candle itself agrees.
pub struct TrendRule;

impl super::FactorRule for TrendRule {
    fn category(&self) -> FactorCategory {
        FactorCategory::TrendAnalysis
    }

    fn max_weight(&self) -> u32 {
        BASE_WEIGHT + AGREEMENT_BONUS
    }

    fn evaluate(&self, input: &super::FactorInput<'_>) -> Option<DecisionFactor> {
        let close = input.current().close;
        let ema = input.snapshot.ema;
        let period = input.config.indicators.ema_period;
        if !ema.is_finite() {
            return None;
        }

        let trend = input.snapshot.trend;
        if close > ema {
            let bonus = if trend == CandleTrend::Bullish {
                AGREEMENT_BONUS
            } else {
                0
            };
            Some(buy_factor(
                BASE_WEIGHT + bonus,
                format!(
                    "Close {:.4} above EMA({}) {:.4}, {} candle",
                    close,
                    period,
                    ema,
                    trend_label(trend)
                ),
            ))
        } else if close < ema {
            let bonus = if trend == CandleTrend::Bearish {
                AGREEMENT_BONUS
            } else {
                0
            };
            Some(sell_factor(
                BASE_WEIGHT + bonus,
                format!(
                    "Close {:.4} below EMA({}) {:.4}, {} candle",
                    close,
                    period,
                    ema,
                    trend_label(trend)
                ),
            ))
        } else {
            Some(neutral_factor(format!("Close sits on EMA({})", period)))
        }
    }
}

fn trend_label(trend: CandleTrend) -> &'static str {
    match trend {
        CandleTrend::Bullish => "bullish",
        CandleTrend::Bearish => "bearish",
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{candle, snapshot};
    use super::super::{FactorInput, FactorRule};
    use super::*;
    use crate::config::SignalConfig;
    use crate::patterns::PatternDetection;

    fn run(current: Candle, ema: f64, trend: CandleTrend) -> DecisionFactor {
        let config = SignalConfig::default();
        let mut snap = snapshot(50.0, 0.0, 0.0, ema);
        snap.trend = trend;
        let detection = PatternDetection::default();
        TrendRule
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
    fn agreeing_candle_adds_bonus() {
        let up = run(candle(0, 10.0, 11.0, 9.9, 10.8), 10.0, CandleTrend::Bullish);
        assert_eq!(up.signal, FactorSignal::Buy);
        assert_eq!(up.weight, 3);

        let mixed = run(candle(0, 10.9, 11.0, 10.4, 10.5), 10.0, CandleTrend::Bearish);
        assert_eq!(mixed.signal, FactorSignal::Buy);
        assert_eq!(mixed.weight, 2);

        let down = run(candle(0, 10.0, 10.1, 9.0, 9.2), 10.0, CandleTrend::Bearish);
        assert_eq!(down.signal, FactorSignal::Sell);
        assert_eq!(down.weight, 3);
    }
}
