use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::patterns::PatternKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Candle {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.body_top()
    }

    pub fn lower_shadow(&self) -> f64 {
        self.body_bottom() - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Direction a single analytical input votes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FactorSignal {
    Buy,
    Sell,
    Neutral,
}

impl FactorSignal {
    /// +1 for BUY, -1 for SELL, 0 for NEUTRAL.
    pub fn sign(self) -> i64 {
        match self {
            FactorSignal::Buy => 1,
            FactorSignal::Sell => -1,
            FactorSignal::Neutral => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionFactor {
    pub signal: FactorSignal,
    pub reasoning: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    CandlestickPattern,
    TrendAnalysis,
    MomentumStrength,
    RsiAnalysis,
    MacdAnalysis,
    VolumeAnalysis,
    SupportResistance,
    InsufficientData,
}

/// Per-category breakdown of a decision. Categories that could not be
/// computed for the window are simply missing from the map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionFactors {
    factors: BTreeMap<FactorCategory, DecisionFactor>,
}

impl DecisionFactors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: FactorCategory, factor: DecisionFactor) {
        self.factors.insert(category, factor);
    }

    pub fn get(&self, category: FactorCategory) -> Option<&DecisionFactor> {
        self.factors.get(&category)
    }

    pub fn contains(&self, category: FactorCategory) -> bool {
        self.factors.contains_key(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FactorCategory, &DecisionFactor)> {
        self.factors.iter()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Sum of BUY weights minus sum of SELL weights.
    pub fn net_direction(&self) -> i64 {
        self.factors
            .values()
            .map(|factor| factor.signal.sign() * factor.weight as i64)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "BUY",
            SignalAction::Sell => "SELL",
            SignalAction::Hold => "HOLD",
        }
    }

    pub fn direction(&self) -> Option<TradeDirection> {
        match self {
            SignalAction::Buy => Some(TradeDirection::Buy),
            SignalAction::Sell => Some(TradeDirection::Sell),
            SignalAction::Hold => None,
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-candle directional label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleTrend {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleStrength {
    Strong,
    Weak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub interval: String,
    pub signal: SignalAction,
    pub entry_price: f64,
    pub current_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub pattern: Option<PatternKind>,
    pub score: u32,
    pub trend: Option<CandleTrend>,
    pub confidence: u32,
    pub timestamp: DateTime<Utc>,
    pub decision_factors: DecisionFactors,
    pub total_score: u32,
}

impl Signal {
    pub fn is_actionable(&self) -> bool {
        !matches!(self.signal, SignalAction::Hold)
    }

    pub fn is_insufficient_data(&self) -> bool {
        self.decision_factors
            .contains(FactorCategory::InsufficientData)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    pub fn as_action(self) -> SignalAction {
        match self {
            TradeDirection::Buy => SignalAction::Buy,
            TradeDirection::Sell => SignalAction::Sell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeOutcome {
    Win,
    Loss,
    Open,
}

impl TradeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeOutcome::Win => "WIN",
            TradeOutcome::Loss => "LOSS",
            TradeOutcome::Open => "OPEN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub exit_price: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
    pub result: TradeOutcome,
    pub profit_usd: Option<f64>,
    pub profit_percent: Option<f64>,
    /// Number of forward candles walked until the exit (or the whole slice when open).
    pub bars_held: usize,
}

/// One simulated trade inside a backtest, with the context that opened it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub symbol: String,
    pub entry_time: DateTime<Utc>,
    pub confidence: u32,
    pub pattern: Option<PatternKind>,
    #[serde(flatten)]
    pub trade: TradeResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitPoint {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub profit_usd: f64,
    pub cumulative_profit_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub profitable_trades: u32,
    pub loss_trades: u32,
    pub open_trades: u32,
    pub total_trades: u32,
    pub win_rate: f64,
    pub avg_profit_per_trade: f64,
    pub median_profit_per_trade: f64,
    pub total_profit_usd: f64,
    pub best_trade_usd: f64,
    pub worst_trade_usd: f64,
    pub max_drawdown_usd: f64,
    pub profit_ratio: f64,
    pub symbol_profit: BTreeMap<String, f64>,
    pub cumulative_profit: Vec<ProfitPoint>,
    pub trades: Vec<BacktestTrade>,
    pub rejected_candles: u32,
    pub truncated: bool,
}
