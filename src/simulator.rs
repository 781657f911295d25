use crate::models::{Candle, Signal, TradeDirection, TradeOutcome, TradeResult};
use crate::trading_rules::{intrabar_exit, price_move, IntrabarPolicy, RiskLevels};

/// Entry side of a simulated trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradePlan {
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub levels: RiskLevels,
}

impl TradePlan {
    pub fn new(
        direction: TradeDirection,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
    ) -> Self {
        Self {
            direction,
            entry_price,
            levels: RiskLevels {
                stop_loss,
                take_profit,
            },
        }
    }

    /// Plan for an actionable signal; `None` for HOLD.
    pub fn from_signal(signal: &Signal) -> Option<Self> {
        let direction = signal.signal.direction()?;
        Some(Self::new(
            direction,
            signal.entry_price,
            signal.stop_loss,
            signal.take_profit,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct TradeSimulator {
    pub policy: IntrabarPolicy,
    pub position_size_usd: f64,
}

impl Default for TradeSimulator {
    fn default() -> Self {
        Self {
            policy: IntrabarPolicy::StopFirst,
            position_size_usd: 1000.0,
        }
    }
}

impl TradeSimulator {
    pub fn new(policy: IntrabarPolicy, position_size_usd: f64) -> Self {
        Self {
            policy,
            position_size_usd,
        }
    }

    /// Walks `forward_candles` in order until the stop or the target is
    /// touched. The trade stays OPEN, with no exit and no profit, when
    /// neither happens.
    pub fn simulate(&self, plan: &TradePlan, forward_candles: &[Candle]) -> TradeResult {
        for (offset, candle) in forward_candles.iter().enumerate() {
            if let Some((outcome, exit_price)) =
                intrabar_exit(candle, &plan.levels, plan.direction, self.policy)
            {
                let (profit_usd, profit_percent) = self.realized_profit(plan, exit_price);
                return TradeResult {
                    direction: plan.direction,
                    entry_price: plan.entry_price,
                    stop_loss: plan.levels.stop_loss,
                    take_profit: plan.levels.take_profit,
                    exit_price: Some(exit_price),
                    exit_time: Some(candle.timestamp),
                    result: outcome,
                    profit_usd: Some(profit_usd),
                    profit_percent: Some(profit_percent),
                    bars_held: offset + 1,
                };
            }
        }

        TradeResult {
            direction: plan.direction,
            entry_price: plan.entry_price,
            stop_loss: plan.levels.stop_loss,
            take_profit: plan.levels.take_profit,
            exit_price: None,
            exit_time: None,
            result: TradeOutcome::Open,
            profit_usd: None,
            profit_percent: None,
            bars_held: forward_candles.len(),
        }
    }

    fn realized_profit(&self, plan: &TradePlan, exit_price: f64) -> (f64, f64) {
        if plan.entry_price <= 0.0 || !plan.entry_price.is_finite() {
            return (0.0, 0.0);
        }
        let per_unit = price_move(plan.entry_price, exit_price, plan.direction);
        let quantity = self.position_size_usd / plan.entry_price;
        (per_unit * quantity, per_unit / plan.entry_price * 100.0)
    }
}
