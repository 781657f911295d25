use crate::factor_utils::{buy_factor, neutral_factor, sell_factor};
use crate::indicators::average_prior_volume;
use crate::models::*;

const SPIKE_WEIGHT: u32 = 2;

/// A volume spike confirms the direction of the candle it happens on.
/// Absent when the window carries no volume.
pub struct VolumeRule;

impl super::FactorRule for VolumeRule {
    fn category(&self) -> FactorCategory {
        FactorCategory::VolumeAnalysis
    }

    fn max_weight(&self) -> u32 {
        SPIKE_WEIGHT
    }

    fn evaluate(&self, input: &super::FactorInput<'_>) -> Option<DecisionFactor> {
        let lookback = input.config.indicators.volume_lookback;
        let average = average_prior_volume(input.candles, input.index, lookback)?;
        let current = input.current();
        let volume = current.volume?;

        if !average.is_finite() || average <= 0.0 {
            return Some(neutral_factor("No baseline volume"));
        }

        let ratio = volume / average;
        if ratio < input.config.volume_spike_ratio {
            return Some(neutral_factor(format!(
                "Volume {:.2}x the {}-candle average",
                ratio, lookback
            )));
        }

        let factor = if current.is_bullish() {
            buy_factor(
                SPIKE_WEIGHT,
                format!("Volume spike {:.2}x on a bullish candle", ratio),
            )
        } else if current.is_bearish() {
            sell_factor(
                SPIKE_WEIGHT,
                format!("Volume spike {:.2}x on a bearish candle", ratio),
            )
        } else {
            neutral_factor(format!("Volume spike {:.2}x without direction", ratio))
        };
        Some(factor)
    }
}
