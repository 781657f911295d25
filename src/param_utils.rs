use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Get a parameter value with a default fallback
pub fn get_param(params: &HashMap<String, f64>, key: &str, default: f64) -> f64 {
    params.get(key).copied().unwrap_or(default)
}

/// Extract a parameter as f64, clamped to a range with finite checks
pub fn get_param_f64_clamped(
    params: &HashMap<String, f64>,
    key: &str,
    default: f64,
    min: f64,
    max: f64,
) -> f64 {
    let raw = params.get(key).copied().unwrap_or(default);
    if !raw.is_finite() {
        return default;
    }
    raw.clamp(min, max)
}

/// Get a parameter as usize with a minimum value
pub fn get_usize_param_min(
    params: &HashMap<String, f64>,
    key: &str,
    default: usize,
    min: usize,
) -> usize {
    params
        .get(key)
        .copied()
        .filter(|v| v.is_finite())
        .map(|v| v.round().max(min as f64) as usize)
        .unwrap_or(default)
}

/// Get a parameter rounded to an i32
pub fn get_rounded_param(params: &HashMap<String, f64>, key: &str, default: i32) -> i32 {
    params
        .get(key)
        .copied()
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i32)
        .unwrap_or(default)
}

pub fn coerce_binary_param(value: f64, default: f64) -> f64 {
    if !value.is_finite() {
        return default;
    }

    if value >= 0.5 {
        1.0
    } else {
        0.0
    }
}

/// Parses a JSON object of parameters into the numeric map the config
/// builders consume. Booleans become 0/1 and numeric strings are parsed;
/// anything else is rejected.
pub fn parse_parameter_map_from_json(json: &str) -> Result<HashMap<String, f64>> {
    let raw: HashMap<String, Value> =
        serde_json::from_str(json).map_err(|error| anyhow!("Invalid parameter JSON: {}", error))?;

    let mut cleaned = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let number = match &value {
            Value::Number(num) => num.as_f64(),
            Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        match number {
            Some(num) if num.is_finite() => {
                cleaned.insert(key, num);
            }
            _ => {
                return Err(anyhow!(
                    "Parameter `{}` must be a finite number (value: {})",
                    key,
                    value
                ));
            }
        }
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_booleans_and_numeric_strings() {
        let params =
            parse_parameter_map_from_json(r#"{"rsiPeriod": 10, "optimistic": true, "minConfidence": "55"}"#)
                .unwrap();
        assert_eq!(params.get("rsiPeriod"), Some(&10.0));
        assert_eq!(params.get("optimistic"), Some(&1.0));
        assert_eq!(params.get("minConfidence"), Some(&55.0));
    }

    #[test]
    fn rejects_non_numeric_values() {
        assert!(parse_parameter_map_from_json(r#"{"mode": "atr"}"#).is_err());
        assert!(parse_parameter_map_from_json(r#"{"periods": [1, 2]}"#).is_err());
        assert!(parse_parameter_map_from_json("not json").is_err());
    }

    #[test]
    fn usize_param_respects_minimum_and_rounding() {
        let mut params = HashMap::new();
        params.insert("period".to_string(), 0.4);
        params.insert("lookback".to_string(), 7.6);
        assert_eq!(get_usize_param_min(&params, "period", 14, 1), 1);
        assert_eq!(get_usize_param_min(&params, "lookback", 20, 1), 8);
        assert_eq!(get_usize_param_min(&params, "missing", 20, 1), 20);
    }

    #[test]
    fn clamped_param_falls_back_on_non_finite() {
        let mut params = HashMap::new();
        params.insert("ratio".to_string(), f64::NAN);
        params.insert("level".to_string(), 140.0);
        assert_eq!(get_param_f64_clamped(&params, "ratio", 0.5, 0.0, 1.0), 0.5);
        assert_eq!(get_param_f64_clamped(&params, "level", 60.0, 0.0, 100.0), 100.0);
    }
}
