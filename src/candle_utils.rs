use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::CandleError;
use crate::models::Candle;

/// A candle tagged with its symbol, as found in flat exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRow {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl CandleRow {
    pub fn into_candle(self) -> (String, Candle) {
        (
            self.symbol,
            Candle {
                timestamp: self.timestamp,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
                volume: self.volume,
            },
        )
    }
}

/// Checks one candle's prices in isolation.
pub fn validate_candle(candle: &Candle) -> Result<(), CandleError> {
    let timestamp = candle.timestamp;
    let prices = [candle.open, candle.high, candle.low, candle.close];
    if prices.iter().any(|p| !p.is_finite()) {
        return Err(CandleError::NonFinitePrice { timestamp });
    }
    if prices.iter().any(|p| *p < 0.0) {
        return Err(CandleError::NegativePrice { timestamp });
    }
    if candle.high < candle.low {
        return Err(CandleError::HighBelowLow {
            timestamp,
            high: candle.high,
            low: candle.low,
        });
    }
    let in_range = |p: f64| p >= candle.low && p <= candle.high;
    if !in_range(candle.open) || !in_range(candle.close) {
        return Err(CandleError::OpenCloseOutsideRange { timestamp });
    }
    if candle.volume.is_some_and(|v| !v.is_finite() || v < 0.0) {
        return Err(CandleError::InvalidVolume { timestamp });
    }
    Ok(())
}

/// Keeps the candles that are well formed and strictly later than the last
/// accepted one, in input order. Rejections are returned and logged.
pub fn sanitize_candles(candles: &[Candle]) -> (Vec<Candle>, Vec<CandleError>) {
    let mut valid: Vec<Candle> = Vec::with_capacity(candles.len());
    let mut rejected = Vec::new();

    for candle in candles {
        let check = validate_candle(candle).and_then(|_| match valid.last() {
            Some(previous) if candle.timestamp <= previous.timestamp => {
                Err(CandleError::NonMonotonicTimestamp {
                    timestamp: candle.timestamp,
                    previous: previous.timestamp,
                })
            }
            _ => Ok(()),
        });

        match check {
            Ok(()) => valid.push(candle.clone()),
            Err(err) => {
                warn!("Rejecting candle: {}", err);
                rejected.push(err);
            }
        }
    }

    (valid, rejected)
}

/// Groups flat rows by normalized symbol, each series sorted by timestamp.
/// Rows with a blank symbol are skipped.
pub fn group_rows_by_symbol(rows: Vec<CandleRow>) -> HashMap<String, Vec<Candle>> {
    let mut grouped: HashMap<String, Vec<Candle>> = HashMap::new();
    for row in rows {
        let (symbol, candle) = row.into_candle();
        let Some(key) = normalize_symbol(&symbol) else {
            continue;
        };
        grouped.entry(key).or_default().push(candle);
    }

    for values in grouped.values_mut() {
        values.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }

    grouped
}

/// Normalizes a symbol string by trimming whitespace and uppercasing.
pub fn normalize_symbol(value: &str) -> Option<String> {
    let normalized = value.trim().to_uppercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Inclusive index range of the candles whose timestamps fall in
/// `[start, end]`. Open bounds cover the whole series.
pub fn window_bounds(
    candles: &[Candle],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<(usize, usize)> {
    let first = match start {
        Some(start) => candles.partition_point(|c| c.timestamp < start),
        None => 0,
    };
    let past_last = match end {
        Some(end) => candles.partition_point(|c| c.timestamp <= end),
        None => candles.len(),
    };
    if first >= past_last {
        None
    } else {
        Some((first, past_last - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn candle(offset: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::days(offset),
            open,
            high,
            low,
            close,
            volume: Some(1_000.0),
        }
    }

    #[test]
    fn sanitize_drops_malformed_candles() {
        let candles = vec![
            candle(0, 10.0, 11.0, 9.0, 10.5),
            candle(1, 10.0, 9.0, 11.0, 10.0),
            candle(2, -1.0, 11.0, 9.0, 10.0),
            candle(3, 10.0, 11.0, 9.0, f64::NAN),
            candle(4, 12.0, 11.0, 9.0, 10.0),
            candle(0, 10.0, 11.0, 9.0, 10.5),
            candle(5, 10.0, 11.0, 9.0, 10.2),
        ];
        let (valid, rejected) = sanitize_candles(&candles);
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[1].close, 10.2);
        assert_eq!(rejected.len(), 5);
        assert!(matches!(rejected[0], CandleError::HighBelowLow { .. }));
        assert!(matches!(rejected[1], CandleError::NegativePrice { .. }));
        assert!(matches!(rejected[2], CandleError::NonFinitePrice { .. }));
        assert!(matches!(rejected[3], CandleError::OpenCloseOutsideRange { .. }));
        assert!(matches!(rejected[4], CandleError::NonMonotonicTimestamp { .. }));
    }

    #[test]
    fn group_rows_normalizes_and_sorts() {
        let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let row = |symbol: &str, day: i64, close: f64| CandleRow {
            symbol: symbol.to_string(),
            timestamp: base + Duration::days(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: None,
        };
        let rows = vec![
            row(" aaa", 1, 104.0),
            row("AAA", 0, 101.0),
            row("  ", 0, 50.0),
            row("bbb", 0, 20.0),
        ];

        let grouped = group_rows_by_symbol(rows);
        assert_eq!(grouped.len(), 2);
        let aaa = grouped.get("AAA").expect("AAA data missing");
        assert_eq!(aaa.len(), 2);
        assert!(aaa[0].timestamp < aaa[1].timestamp);
        assert!(grouped.contains_key("BBB"));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let candles: Vec<Candle> = (0..10).map(|i| candle(i, 1.0, 2.0, 0.5, 1.5)).collect();
        let start = candles[2].timestamp;
        let end = candles[5].timestamp;
        assert_eq!(window_bounds(&candles, Some(start), Some(end)), Some((2, 5)));
        assert_eq!(window_bounds(&candles, None, None), Some((0, 9)));
        assert_eq!(window_bounds(&candles, Some(end), Some(start)), None);
        assert_eq!(window_bounds(&[], None, None), None);
    }
}
