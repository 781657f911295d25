use crate::models::{DecisionFactor, FactorSignal};

/// Create a neutral factor (the category was computed but votes for nothing)
pub fn neutral_factor(reasoning: impl Into<String>) -> DecisionFactor {
    DecisionFactor {
        signal: FactorSignal::Neutral,
        reasoning: reasoning.into(),
        weight: 0,
    }
}

/// Create a buy factor with the given weight
pub fn buy_factor(weight: u32, reasoning: impl Into<String>) -> DecisionFactor {
    DecisionFactor {
        signal: FactorSignal::Buy,
        reasoning: reasoning.into(),
        weight,
    }
}

/// Create a sell factor with the given weight
pub fn sell_factor(weight: u32, reasoning: impl Into<String>) -> DecisionFactor {
    DecisionFactor {
        signal: FactorSignal::Sell,
        reasoning: reasoning.into(),
        weight,
    }
}

/// Factor voting for `signal`; a zero weight collapses to neutral.
pub fn directional_factor(
    signal: FactorSignal,
    weight: u32,
    reasoning: impl Into<String>,
) -> DecisionFactor {
    match signal {
        FactorSignal::Buy if weight > 0 => buy_factor(weight, reasoning),
        FactorSignal::Sell if weight > 0 => sell_factor(weight, reasoning),
        _ => neutral_factor(reasoning),
    }
}

/// Check if confidence meets the minimum threshold. The bound is inclusive.
pub fn meets_confidence_threshold(confidence: u32, min_confidence: u32) -> bool {
    confidence >= min_confidence
}

/// Converts `score / max_score` to a whole percentage in [0, 100].
pub fn normalized_confidence(score: u32, max_score: u32) -> u32 {
    if max_score == 0 {
        return 0;
    }
    let ratio = score as f64 / max_score as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weight_directional_factor_is_neutral() {
        let factor = directional_factor(FactorSignal::Buy, 0, "flat");
        assert_eq!(factor.signal, FactorSignal::Neutral);
        assert_eq!(factor.weight, 0);
        assert_eq!(directional_factor(FactorSignal::Sell, 2, "x").signal, FactorSignal::Sell);
    }

    #[test]
    fn confidence_is_rounded_and_bounded() {
        assert_eq!(normalized_confidence(0, 0), 0);
        assert_eq!(normalized_confidence(2, 3), 67);
        assert_eq!(normalized_confidence(5, 4), 100);
    }

    #[test]
    fn confidence_equal_to_threshold_qualifies() {
        assert!(meets_confidence_threshold(60, 60));
        assert!(meets_confidence_threshold(61, 60));
        assert!(!meets_confidence_threshold(59, 60));
        assert!(meets_confidence_threshold(0, 0));
    }
}
