use anyhow::{anyhow, Result};
use std::collections::HashMap;

use crate::param_utils::{
    coerce_binary_param, get_param, get_param_f64_clamped, get_rounded_param,
    get_usize_param_min,
};
use crate::trading_rules::IntrabarPolicy;

/// How the MACD line and its signal line are smoothed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdSmoothing {
    /// Canonical MACD: EMA(fast) - EMA(slow), signal = EMA of the MACD line.
    Exponential,
    /// Trailing arithmetic means of closes for fast, slow and signal windows.
    TrailingMean,
}

#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
    pub macd_smoothing: MacdSmoothing,
    pub ema_period: usize,
    pub atr_period: usize,
    pub volume_lookback: usize,
    pub support_resistance_lookback: usize,
    /// Body/range ratio above which a candle counts as strong.
    pub strong_body_ratio: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast_period: 12,
            macd_slow_period: 26,
            macd_signal_period: 9,
            macd_smoothing: MacdSmoothing::Exponential,
            ema_period: 20,
            atr_period: 14,
            volume_lookback: 20,
            support_resistance_lookback: 20,
            strong_body_ratio: 0.7,
        }
    }
}

impl IndicatorConfig {
    pub fn macd_required_candles(&self) -> usize {
        match self.macd_smoothing {
            MacdSmoothing::Exponential => self.macd_slow_period + self.macd_signal_period,
            MacdSmoothing::TrailingMean => self.macd_slow_period.max(self.macd_signal_period),
        }
    }

    /// Candles needed before every indicator has a full window.
    pub fn min_lookback(&self) -> usize {
        [
            self.rsi_period + 1,
            self.macd_required_candles(),
            self.ema_period,
            self.atr_period + 1,
            self.support_resistance_lookback + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }
}

#[derive(Debug, Clone)]
pub struct PatternConfig {
    /// Body/range ratio below which a candle is a doji.
    pub doji_body_ratio: f64,
    /// Fraction of the range the body must sit in for hammer/shooting star.
    pub hammer_body_zone: f64,
    pub shadow_body_multiple: f64,
    pub opposite_shadow_ratio: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            doji_body_ratio: 0.1,
            hammer_body_zone: 0.4,
            shadow_body_multiple: 2.0,
            opposite_shadow_ratio: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskMode {
    Percent,
    Atr,
}

/// Stop-loss and take-profit offsets from the entry price
#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub mode: RiskMode,
    pub stop_atr_multiple: f64,
    pub target_atr_multiple: f64,
    pub stop_ratio: f64,
    pub target_ratio: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            mode: RiskMode::Atr,
            stop_atr_multiple: 1.5,
            target_atr_multiple: 3.0,
            stop_ratio: 0.02,
            target_ratio: 0.04,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Minimum confidence (0-100) for a BUY/SELL decision.
    pub min_confidence: u32,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub volume_spike_ratio: f64,
    pub support_resistance_tolerance: f64,
    pub indicators: IndicatorConfig,
    pub patterns: PatternConfig,
    pub risk: RiskConfig,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_confidence: 60,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            volume_spike_ratio: 1.5,
            support_resistance_tolerance: 0.01,
            indicators: IndicatorConfig::default(),
            patterns: PatternConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl SignalConfig {
    /// Create a new SignalConfig from a parameter map
    pub fn from_parameters(parameters: &HashMap<String, f64>) -> Self {
        let defaults = Self::default();
        let indicator_defaults = defaults.indicators.clone();
        let pattern_defaults = defaults.patterns.clone();
        let risk_defaults = defaults.risk.clone();

        Self {
            min_confidence: get_param_f64_clamped(
                parameters,
                "minConfidence",
                defaults.min_confidence as f64,
                0.0,
                100.0,
            )
            .round() as u32,
            rsi_oversold: get_param(parameters, "rsiOversold", defaults.rsi_oversold),
            rsi_overbought: get_param(parameters, "rsiOverbought", defaults.rsi_overbought),
            volume_spike_ratio: get_param(
                parameters,
                "volumeSpikeRatio",
                defaults.volume_spike_ratio,
            ),
            support_resistance_tolerance: get_param(
                parameters,
                "supportResistanceTolerance",
                defaults.support_resistance_tolerance,
            ),
            indicators: IndicatorConfig {
                rsi_period: get_usize_param_min(
                    parameters,
                    "rsiPeriod",
                    indicator_defaults.rsi_period,
                    1,
                ),
                macd_fast_period: get_usize_param_min(
                    parameters,
                    "macdFastPeriod",
                    indicator_defaults.macd_fast_period,
                    1,
                ),
                macd_slow_period: get_usize_param_min(
                    parameters,
                    "macdSlowPeriod",
                    indicator_defaults.macd_slow_period,
                    1,
                ),
                macd_signal_period: get_usize_param_min(
                    parameters,
                    "macdSignalPeriod",
                    indicator_defaults.macd_signal_period,
                    1,
                ),
                macd_smoothing: match get_rounded_param(parameters, "macdSmoothing", 0) {
                    1 => MacdSmoothing::TrailingMean,
                    _ => MacdSmoothing::Exponential,
                },
                ema_period: get_usize_param_min(
                    parameters,
                    "emaPeriod",
                    indicator_defaults.ema_period,
                    1,
                ),
                atr_period: get_usize_param_min(
                    parameters,
                    "atrPeriod",
                    indicator_defaults.atr_period,
                    1,
                ),
                volume_lookback: get_usize_param_min(
                    parameters,
                    "volumeLookback",
                    indicator_defaults.volume_lookback,
                    1,
                ),
                support_resistance_lookback: get_usize_param_min(
                    parameters,
                    "supportResistanceLookback",
                    indicator_defaults.support_resistance_lookback,
                    1,
                ),
                strong_body_ratio: get_param(
                    parameters,
                    "strongBodyRatio",
                    indicator_defaults.strong_body_ratio,
                ),
            },
            patterns: PatternConfig {
                doji_body_ratio: get_param(
                    parameters,
                    "dojiBodyRatio",
                    pattern_defaults.doji_body_ratio,
                ),
                hammer_body_zone: get_param(
                    parameters,
                    "hammerBodyZone",
                    pattern_defaults.hammer_body_zone,
                ),
                shadow_body_multiple: get_param(
                    parameters,
                    "shadowBodyMultiple",
                    pattern_defaults.shadow_body_multiple,
                ),
                opposite_shadow_ratio: get_param(
                    parameters,
                    "oppositeShadowRatio",
                    pattern_defaults.opposite_shadow_ratio,
                ),
            },
            risk: RiskConfig {
                mode: match get_rounded_param(parameters, "riskMode", 1) {
                    0 => RiskMode::Percent,
                    _ => RiskMode::Atr,
                },
                stop_atr_multiple: get_param(
                    parameters,
                    "stopAtrMultiple",
                    risk_defaults.stop_atr_multiple,
                ),
                target_atr_multiple: get_param(
                    parameters,
                    "targetAtrMultiple",
                    risk_defaults.target_atr_multiple,
                ),
                stop_ratio: get_param(parameters, "stopRatio", risk_defaults.stop_ratio),
                target_ratio: get_param(parameters, "targetRatio", risk_defaults.target_ratio),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ind = &self.indicators;
        for (name, period) in [
            ("rsiPeriod", ind.rsi_period),
            ("macdFastPeriod", ind.macd_fast_period),
            ("macdSlowPeriod", ind.macd_slow_period),
            ("macdSignalPeriod", ind.macd_signal_period),
            ("emaPeriod", ind.ema_period),
            ("atrPeriod", ind.atr_period),
            ("volumeLookback", ind.volume_lookback),
            ("supportResistanceLookback", ind.support_resistance_lookback),
        ] {
            if period == 0 {
                return Err(anyhow!("Parameter {} must be >= 1", name));
            }
        }
        if ind.macd_fast_period >= ind.macd_slow_period {
            return Err(anyhow!(
                "macdFastPeriod ({}) must be < macdSlowPeriod ({})",
                ind.macd_fast_period,
                ind.macd_slow_period
            ));
        }
        if self.min_confidence > 100 {
            return Err(anyhow!(
                "minConfidence must be within 0..=100 (value: {})",
                self.min_confidence
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_oversold)
            || !(0.0..=100.0).contains(&self.rsi_overbought)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return Err(anyhow!(
                "RSI thresholds must satisfy 0 <= rsiOversold ({}) < rsiOverbought ({}) <= 100",
                self.rsi_oversold,
                self.rsi_overbought
            ));
        }

        require_positive("volumeSpikeRatio", self.volume_spike_ratio)?;
        require_non_negative(
            "supportResistanceTolerance",
            self.support_resistance_tolerance,
        )?;

        let patterns = &self.patterns;
        require_positive("dojiBodyRatio", patterns.doji_body_ratio)?;
        require_positive("hammerBodyZone", patterns.hammer_body_zone)?;
        require_positive("shadowBodyMultiple", patterns.shadow_body_multiple)?;
        require_positive("oppositeShadowRatio", patterns.opposite_shadow_ratio)?;
        require_positive("strongBodyRatio", ind.strong_body_ratio)?;

        let risk = &self.risk;
        match risk.mode {
            RiskMode::Atr => {
                require_positive("stopAtrMultiple", risk.stop_atr_multiple)?;
                require_positive("targetAtrMultiple", risk.target_atr_multiple)?;
            }
            RiskMode::Percent => {
                require_positive("stopRatio", risk.stop_ratio)?;
                require_positive("targetRatio", risk.target_ratio)?;
                if risk.stop_ratio >= 1.0 {
                    return Err(anyhow!(
                        "stopRatio must be < 1 (value: {})",
                        risk.stop_ratio
                    ));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub min_confidence: u32,
    pub position_size_usd: f64,
    pub intrabar_policy: IntrabarPolicy,
    pub signal: SignalConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        let signal = SignalConfig::default();
        Self {
            min_confidence: signal.min_confidence,
            position_size_usd: 1000.0,
            intrabar_policy: IntrabarPolicy::StopFirst,
            signal,
        }
    }
}

impl BacktestConfig {
    pub fn from_parameters(parameters: &HashMap<String, f64>) -> Self {
        let signal = SignalConfig::from_parameters(parameters);
        let optimistic = coerce_binary_param(get_param(parameters, "optimistic", 0.0), 0.0);
        Self {
            min_confidence: signal.min_confidence,
            position_size_usd: get_param(parameters, "positionSize", 1000.0),
            intrabar_policy: if optimistic >= 0.5 {
                IntrabarPolicy::TargetFirst
            } else {
                IntrabarPolicy::StopFirst
            },
            signal,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.signal.validate()?;
        if self.min_confidence > 100 {
            return Err(anyhow!(
                "minConfidence must be within 0..=100 (value: {})",
                self.min_confidence
            ));
        }
        require_positive("positionSize", self.position_size_usd)
    }
}

fn require_positive(key: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(anyhow!("Parameter {} must be > 0 (value: {})", key, value));
    }
    Ok(())
}

fn require_non_negative(key: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!("Parameter {} must be >= 0 (value: {})", key, value));
    }
    Ok(())
}
