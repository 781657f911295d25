
use crate::config::{RiskConfig, RiskMode};
use crate::models::{Candle, TradeDirection, TradeOutcome};

/// Which exit wins when one candle's range covers both the stop and the
/// target. OHLC data cannot tell which was touched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntrabarPolicy {
    /// Assume the stop was hit first.
    #[default]
    StopFirst,
    /// Assume the target was hit first.
    TargetFirst,
}

impl IntrabarPolicy {
    pub fn label(self) -> &'static str {
        match self {
            IntrabarPolicy::StopFirst => "stop-first",
            IntrabarPolicy::TargetFirst => "target-first",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl RiskLevels {
    /// `stop < entry < target` for BUY, mirrored for SELL.
    pub fn is_ordered(&self, entry_price: f64, direction: TradeDirection) -> bool {
        match direction {
            TradeDirection::Buy => self.stop_loss < entry_price && entry_price < self.take_profit,
            TradeDirection::Sell => {
                self.take_profit < entry_price && entry_price < self.stop_loss
            }
        }
    }
}

/// Stop and target offsets from `entry_price`. ATR mode falls back to the
/// percent offsets when the ATR is unusable; `None` when no ordered pair of
/// levels can be built.
pub fn risk_levels(
    config: &RiskConfig,
    entry_price: f64,
    atr: Option<f64>,
    direction: TradeDirection,
) -> Option<RiskLevels> {
    if !entry_price.is_finite() || entry_price <= 0.0 {
        return None;
    }

    let atr_offsets = match (config.mode, atr) {
        (RiskMode::Atr, Some(atr)) if atr.is_finite() && atr > 0.0 => Some((
            config.stop_atr_multiple * atr,
            config.target_atr_multiple * atr,
        )),
        _ => None,
    };
    let (stop_offset, target_offset) = atr_offsets.unwrap_or((
        entry_price * config.stop_ratio,
        entry_price * config.target_ratio,
    ));

    let levels = match direction {
        TradeDirection::Buy => RiskLevels {
            stop_loss: entry_price - stop_offset,
            take_profit: entry_price + target_offset,
        },
        TradeDirection::Sell => RiskLevels {
            stop_loss: entry_price + stop_offset,
            take_profit: entry_price - target_offset,
        },
    };

    let finite = levels.stop_loss.is_finite() && levels.take_profit.is_finite();
    let non_negative = levels.stop_loss >= 0.0 && levels.take_profit >= 0.0;
    if finite && non_negative && levels.is_ordered(entry_price, direction) {
        Some(levels)
    } else {
        None
    }
}

pub fn stop_hit(candle: &Candle, stop_loss: f64, direction: TradeDirection) -> bool {
    match direction {
        TradeDirection::Buy => candle.low <= stop_loss,
        TradeDirection::Sell => candle.high >= stop_loss,
    }
}

pub fn target_hit(candle: &Candle, take_profit: f64, direction: TradeDirection) -> bool {
    match direction {
        TradeDirection::Buy => candle.high >= take_profit,
        TradeDirection::Sell => candle.low <= take_profit,
    }
}

/// Resolves whether `candle` closes the trade, returning the outcome and the
/// level it exits at.
pub fn intrabar_exit(
    candle: &Candle,
    levels: &RiskLevels,
    direction: TradeDirection,
    policy: IntrabarPolicy,
) -> Option<(TradeOutcome, f64)> {
    let stopped = stop_hit(candle, levels.stop_loss, direction);
    let targeted = target_hit(candle, levels.take_profit, direction);

    match (stopped, targeted, policy) {
        (true, true, IntrabarPolicy::StopFirst) | (true, false, _) => {
            Some((TradeOutcome::Loss, levels.stop_loss))
        }
        (true, true, IntrabarPolicy::TargetFirst) | (false, true, _) => {
            Some((TradeOutcome::Win, levels.take_profit))
        }
        (false, false, _) => None,
    }
}

/// Signed profit in price units per unit held.
pub fn price_move(entry_price: f64, exit_price: f64, direction: TradeDirection) -> f64 {
    match direction {
        TradeDirection::Buy => exit_price - entry_price,
        TradeDirection::Sell => entry_price - exit_price,
    }
}
