use chrono::{DateTime, Utc};
use thiserror::Error;

/// Indicator-level failures. None of these are fatal: callers degrade to a
/// HOLD decision or skip the candle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    #[error("Insufficient data for {indicator}: need {required} candles, have {available}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },
    #[error("Invalid period for {indicator}: {period}")]
    InvalidPeriod {
        indicator: &'static str,
        period: usize,
    },
}

/// Reasons a candle is rejected from a series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CandleError {
    #[error("Candle at {timestamp} has a non-finite price")]
    NonFinitePrice { timestamp: DateTime<Utc> },
    #[error("Candle at {timestamp} has a negative price")]
    NegativePrice { timestamp: DateTime<Utc> },
    #[error("Candle at {timestamp} has high {high} below low {low}")]
    HighBelowLow {
        timestamp: DateTime<Utc>,
        high: f64,
        low: f64,
    },
    #[error("Candle at {timestamp} has open/close outside its high-low range")]
    OpenCloseOutsideRange { timestamp: DateTime<Utc> },
    #[error("Candle at {timestamp} has a negative or non-finite volume")]
    InvalidVolume { timestamp: DateTime<Utc> },
    #[error("Candle at {timestamp} does not follow previous candle at {previous}")]
    NonMonotonicTimestamp {
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}
