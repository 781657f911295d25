use serde::{Deserialize, Serialize};

use crate::config::{IndicatorConfig, MacdSmoothing};
use crate::error::IndicatorError;
use crate::models::{Candle, CandleStrength, CandleTrend};

pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.is_empty() {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema_values = Vec::with_capacity(prices.len());
    ema_values.push(prices[0]);

    for i in 1..prices.len() {
        let ema = (prices[i] * multiplier) + (ema_values[i - 1] * (1.0 - multiplier));
        ema_values.push(ema);
    }

    ema_values
}

/// Arithmetic mean of the last `period` values, `None` when the slice is shorter.
pub fn trailing_mean(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

pub fn calculate_macd(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast_ema = calculate_ema(prices, fast_period);
    let slow_ema = calculate_ema(prices, slow_period);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(fast, slow)| fast - slow)
        .collect();

    let signal_line = calculate_ema(&macd_line, signal_period);

    let histogram = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(macd, signal)| macd - signal)
        .collect();

    (macd_line, signal_line, histogram)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
}

/// MACD as of the last close in `closes`.
pub fn macd_latest(
    closes: &[f64],
    config: &IndicatorConfig,
) -> Result<MacdOutput, IndicatorError> {
    let required = config.macd_required_candles();
    if closes.len() < required {
        return Err(IndicatorError::InsufficientData {
            indicator: "macd",
            required,
            available: closes.len(),
        });
    }

    match config.macd_smoothing {
        MacdSmoothing::Exponential => {
            let (macd_line, signal_line, histogram) = calculate_macd(
                closes,
                config.macd_fast_period,
                config.macd_slow_period,
                config.macd_signal_period,
            );
            match (macd_line.last(), signal_line.last(), histogram.last()) {
                (Some(&macd_line), Some(&signal_line), Some(&histogram)) => Ok(MacdOutput {
                    macd_line,
                    signal_line,
                    histogram,
                }),
                _ => Err(IndicatorError::InsufficientData {
                    indicator: "macd",
                    required,
                    available: closes.len(),
                }),
            }
        }
        MacdSmoothing::TrailingMean => {
            let insufficient = || IndicatorError::InsufficientData {
                indicator: "macd",
                required,
                available: closes.len(),
            };
            let fast = trailing_mean(closes, config.macd_fast_period).ok_or_else(insufficient)?;
            let slow = trailing_mean(closes, config.macd_slow_period).ok_or_else(insufficient)?;
            // Signal is a trailing mean of closes, not of the MACD line.
            let signal_line =
                trailing_mean(closes, config.macd_signal_period).ok_or_else(insufficient)?;
            let macd_line = fast - slow;
            Ok(MacdOutput {
                macd_line,
                signal_line,
                histogram: macd_line - signal_line,
            })
        }
    }
}

fn rsi_from_avgs(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

/// RSI over the trailing `period` close-to-close deltas ending at `index`,
/// using plain averages of gains and losses.
pub fn calculate_rsi_at(
    closes: &[f64],
    period: usize,
    index: usize,
) -> Result<f64, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod {
            indicator: "rsi",
            period,
        });
    }
    let available = if index < closes.len() { index + 1 } else { closes.len() };
    if index >= closes.len() || index < period {
        return Err(IndicatorError::InsufficientData {
            indicator: "rsi",
            required: period + 1,
            available,
        });
    }

    let mut sum_gain = 0.0f64;
    let mut sum_loss = 0.0f64;
    for i in (index + 1 - period)..=index {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            sum_gain += delta;
        } else {
            sum_loss += -delta;
        }
    }

    let rsi = rsi_from_avgs(sum_gain / period as f64, sum_loss / period as f64);
    Ok(rsi.clamp(0.0, 100.0))
}

/// Mean true range over the `period` candles ending at `index`.
pub fn calculate_atr_at(
    candles: &[Candle],
    index: usize,
    period: usize,
) -> Result<f64, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod {
            indicator: "atr",
            period,
        });
    }
    if index >= candles.len() || index < period {
        return Err(IndicatorError::InsufficientData {
            indicator: "atr",
            required: period + 1,
            available: candles.len().min(index + 1),
        });
    }

    let mut tr_sum = 0.0f64;
    for i in (index + 1 - period)..=index {
        let candle = &candles[i];
        let prev_close = candles[i - 1].close;
        let tr = (candle.high - candle.low)
            .max((candle.high - prev_close).abs())
            .max((candle.low - prev_close).abs());
        tr_sum += tr;
    }

    Ok(tr_sum / period as f64)
}

pub fn candle_trend(candle: &Candle) -> CandleTrend {
    if candle.close > candle.open {
        CandleTrend::Bullish
    } else {
        CandleTrend::Bearish
    }
}

/// Intrabar range as a percentage of the low. Zero when the low is zero.
pub fn candle_volatility(candle: &Candle) -> f64 {
    if candle.low <= 0.0 {
        return 0.0;
    }
    let volatility = (candle.high - candle.low) / candle.low * 100.0;
    if volatility.is_finite() {
        volatility
    } else {
        0.0
    }
}

/// Strong when the body covers more than `strong_body_ratio` of the range.
/// A zero-range candle is always weak.
pub fn candle_strength(candle: &Candle, strong_body_ratio: f64) -> CandleStrength {
    let range = candle.range();
    if range <= 0.0 {
        return CandleStrength::Weak;
    }
    if candle.body() / range > strong_body_ratio {
        CandleStrength::Strong
    } else {
        CandleStrength::Weak
    }
}

/// Mean volume of the `lookback` candles before `index`. `None` if any of
/// them (or the current candle) carries no volume.
pub fn average_prior_volume(candles: &[Candle], index: usize, lookback: usize) -> Option<f64> {
    if lookback == 0 || index >= candles.len() || index < lookback {
        return None;
    }
    candles[index].volume?;
    let mut sum = 0.0;
    for candle in &candles[index - lookback..index] {
        sum += candle.volume?;
    }
    Some(sum / lookback as f64)
}

/// Lowest low and highest high of the `lookback` candles before `index`.
pub fn support_resistance(candles: &[Candle], index: usize, lookback: usize) -> Option<(f64, f64)> {
    if lookback == 0 || index >= candles.len() || index < lookback {
        return None;
    }
    let window = &candles[index - lookback..index];
    let support = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let resistance = window
        .iter()
        .map(|c| c.high)
        .fold(f64::NEG_INFINITY, f64::max);
    if support.is_finite() && resistance.is_finite() {
        Some((support, resistance))
    } else {
        None
    }
}

/// Everything the signal engine reads about one candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: MacdOutput,
    pub ema: f64,
    pub atr: f64,
    pub trend: CandleTrend,
    pub volatility: f64,
    pub strength: CandleStrength,
}

/// Computes the indicator snapshot as of `index`, reading only candles up
/// to and including it.
pub fn compute(
    candles: &[Candle],
    index: usize,
    config: &IndicatorConfig,
) -> Result<IndicatorSnapshot, IndicatorError> {
    let required = config.min_lookback();
    if index >= candles.len() || index + 1 < required {
        return Err(IndicatorError::InsufficientData {
            indicator: "indicator set",
            required,
            available: candles.len().min(index + 1),
        });
    }

    let closes: Vec<f64> = candles[..=index].iter().map(|c| c.close).collect();
    let current = &candles[index];

    let rsi = calculate_rsi_at(&closes, config.rsi_period, index)?;
    let macd = macd_latest(&closes, config)?;
    let ema = calculate_ema(&closes, config.ema_period)
        .last()
        .copied()
        .unwrap_or(current.close);
    let atr = calculate_atr_at(candles, index, config.atr_period)?;

    Ok(IndicatorSnapshot {
        rsi,
        macd,
        ema,
        atr,
        trend: candle_trend(current),
        volatility: candle_volatility(current),
        strength: candle_strength(current, config.strong_body_ratio),
    })
}
