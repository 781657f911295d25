//! Candlestick formations over the latest one or two candles.
//!
//! Every formation carries a fixed weight. When several match the same
//! candle the heaviest one is reported, while the candle's score is the sum
//! of all matched weights.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PatternConfig;
use crate::models::{Candle, FactorSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    #[serde(rename = "Doji")]
    Doji,
    #[serde(rename = "Hammer")]
    Hammer,
    #[serde(rename = "Shooting Star")]
    ShootingStar,
    #[serde(rename = "Bullish Engulfing")]
    BullishEngulfing,
    #[serde(rename = "Bearish Engulfing")]
    BearishEngulfing,
}

/// Directional reading of a formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternBias {
    Bullish,
    Bearish,
    Neutral,
}

impl PatternKind {
    pub const ALL: [PatternKind; 5] = [
        PatternKind::Doji,
        PatternKind::Hammer,
        PatternKind::ShootingStar,
        PatternKind::BullishEngulfing,
        PatternKind::BearishEngulfing,
    ];

    /// Largest score a single candle can collect: a doji-bodied hammer or
    /// shooting star that also engulfs the previous candle.
    pub const MAX_COMBINED_WEIGHT: u32 = 8;

    pub fn weight(self) -> u32 {
        match self {
            PatternKind::Doji => 1,
            PatternKind::Hammer => 3,
            PatternKind::ShootingStar => 3,
            PatternKind::BullishEngulfing => 4,
            PatternKind::BearishEngulfing => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Doji => "Doji",
            PatternKind::Hammer => "Hammer",
            PatternKind::ShootingStar => "Shooting Star",
            PatternKind::BullishEngulfing => "Bullish Engulfing",
            PatternKind::BearishEngulfing => "Bearish Engulfing",
        }
    }

    pub fn bias(self) -> PatternBias {
        match self {
            PatternKind::Doji => PatternBias::Neutral,
            PatternKind::Hammer | PatternKind::BullishEngulfing => PatternBias::Bullish,
            PatternKind::ShootingStar | PatternKind::BearishEngulfing => PatternBias::Bearish,
        }
    }

    pub fn factor_signal(self) -> FactorSignal {
        match self.bias() {
            PatternBias::Bullish => FactorSignal::Buy,
            PatternBias::Bearish => FactorSignal::Sell,
            PatternBias::Neutral => FactorSignal::Neutral,
        }
    }

    fn matches(self, current: &Candle, previous: Option<&Candle>, config: &PatternConfig) -> bool {
        let range = current.range();
        if range <= 0.0 {
            return false;
        }
        let body = current.body();

        match self {
            PatternKind::Doji => body / range < config.doji_body_ratio,
            PatternKind::Hammer => {
                let zone_floor = current.high - config.hammer_body_zone * range;
                let lower = current.lower_shadow();
                current.body_bottom() >= zone_floor
                    && lower >= config.shadow_body_multiple * body
                    && current.upper_shadow() < config.opposite_shadow_ratio * lower
            }
            PatternKind::ShootingStar => {
                let zone_ceiling = current.low + config.hammer_body_zone * range;
                let upper = current.upper_shadow();
                current.body_top() <= zone_ceiling
                    && upper >= config.shadow_body_multiple * body
                    && current.lower_shadow() < config.opposite_shadow_ratio * upper
            }
            PatternKind::BullishEngulfing => previous.is_some_and(|prev| {
                prev.is_bearish()
                    && current.is_bullish()
                    && current.open <= prev.close
                    && current.close >= prev.open
            }),
            PatternKind::BearishEngulfing => previous.is_some_and(|prev| {
                prev.is_bullish()
                    && current.is_bearish()
                    && current.open >= prev.close
                    && current.close <= prev.open
            }),
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatternDetection {
    /// Heaviest matched formation.
    pub pattern: Option<PatternKind>,
    /// Sum of every matched formation's weight.
    pub score: u32,
    pub matched: Vec<PatternKind>,
}

impl PatternDetection {
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }
}

pub fn detect(current: &Candle, previous: Option<&Candle>, config: &PatternConfig) -> PatternDetection {
    let matched: Vec<PatternKind> = PatternKind::ALL
        .into_iter()
        .filter(|kind| kind.matches(current, previous, config))
        .collect();

    let score = matched.iter().map(|kind| kind.weight()).sum();
    // Ties keep declaration order.
    let pattern = matched
        .iter()
        .copied()
        .fold(None, |best: Option<PatternKind>, kind| match best {
            Some(current_best) if current_best.weight() >= kind.weight() => Some(current_best),
            _ => Some(kind),
        });

    PatternDetection {
        pattern,
        score,
        matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    fn run(current: &Candle, previous: Option<&Candle>) -> PatternDetection {
        detect(current, previous, &PatternConfig::default())
    }

    #[test]
    fn detects_doji() {
        let detection = run(&candle(10.0, 15.0, 9.0, 10.5), None);
        assert_eq!(detection.pattern, Some(PatternKind::Doji));
        assert_eq!(detection.score, 1);
    }

    #[test]
    fn detects_bullish_engulfing() {
        let previous = candle(10.0, 10.1, 8.9, 9.0);
        let current = candle(8.9, 10.3, 8.8, 10.2);
        let detection = run(&current, Some(&previous));
        assert_eq!(detection.pattern, Some(PatternKind::BullishEngulfing));
        assert!(detection.score >= 4);
    }

    #[test]
    fn detects_bearish_engulfing() {
        let previous = candle(9.0, 10.1, 8.9, 10.0);
        let current = candle(10.1, 10.2, 8.7, 8.8);
        let detection = run(&current, Some(&previous));
        assert_eq!(detection.pattern, Some(PatternKind::BearishEngulfing));
        assert_eq!(detection.score, 4);
    }

    #[test]
    fn engulfing_needs_previous_candle() {
        let current = candle(8.9, 10.3, 8.8, 10.2);
        let detection = run(&current, None);
        assert!(!detection.matched.contains(&PatternKind::BullishEngulfing));
    }

    #[test]
    fn detects_hammer_and_shooting_star() {
        // body 0.6 at the top, lower shadow 4.3, upper shadow 0.1
        let hammer = run(&candle(14.3, 15.0, 10.0, 14.9), None);
        assert_eq!(hammer.pattern, Some(PatternKind::Hammer));
        assert_eq!(hammer.score, 3);

        let star = run(&candle(10.7, 15.0, 10.0, 10.1), None);
        assert_eq!(star.pattern, Some(PatternKind::ShootingStar));
        assert_eq!(star.score, 3);
    }

    #[test]
    fn multiple_matches_report_heaviest_and_sum_weights() {
        // Tiny body at the top of the range: doji + hammer.
        let detection = run(&candle(14.85, 15.0, 10.0, 14.9), None);
        assert_eq!(
            detection.matched,
            vec![PatternKind::Doji, PatternKind::Hammer]
        );
        assert_eq!(detection.pattern, Some(PatternKind::Hammer));
        assert_eq!(detection.score, 4);
    }

    #[test]
    fn zero_range_candle_matches_nothing() {
        let flat = candle(10.0, 10.0, 10.0, 10.0);
        let detection = run(&flat, Some(&candle(11.0, 11.0, 9.0, 10.5)));
        assert!(detection.is_empty());
        assert_eq!(detection.pattern, None);
        assert_eq!(detection.score, 0);
    }

    #[test]
    fn weight_table_and_names_are_consistent() {
        for kind in PatternKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
            assert!(kind.weight() >= 1);
        }
        assert_eq!(PatternKind::ShootingStar.factor_signal(), FactorSignal::Sell);
        assert_eq!(PatternKind::Hammer.factor_signal(), FactorSignal::Buy);
        assert_eq!(PatternKind::Doji.factor_signal(), FactorSignal::Neutral);
    }
}
