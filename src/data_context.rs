use crate::candle_utils::{group_rows_by_symbol, normalize_symbol, CandleRow};
use crate::models::Candle;
use anyhow::{anyhow, Context, Result};
use chrono::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

const MARKET_DATA_SNAPSHOT_VERSION: u32 = 1;
pub const DEFAULT_INTERVAL: &str = "1d";

/// Supplies ordered candle series, oldest first.
pub trait CandleSource: Sync {
    /// The most recent `lookback` candles for `symbol`, or the whole series
    /// when `lookback` is `None`.
    fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        lookback: Option<usize>,
    ) -> Result<Vec<Candle>>;
}

#[derive(Serialize, Deserialize)]
struct MarketDataSnapshot {
    version: u32,
    generated_at: DateTime<Utc>,
    interval: String,
    series: BTreeMap<String, Vec<Candle>>,
}

/// Accepted JSON layouts: `{ "SYMBOL": [candle, ...] }` or a flat array of
/// rows carrying a `symbol` field.
#[derive(Deserialize)]
#[serde(untagged)]
enum MarketDataFile {
    Grouped(HashMap<String, Vec<Candle>>),
    Rows(Vec<CandleRow>),
}

/// In-memory candle series for a set of symbols sharing one interval.
#[derive(Clone)]
pub struct MarketData {
    interval: String,
    symbols: Arc<Vec<String>>,
    candles_by_symbol: Arc<HashMap<String, Vec<Candle>>>,
}

impl MarketData {
    pub fn from_series(interval: &str, series: HashMap<String, Vec<Candle>>) -> Result<Self> {
        let mut candles_by_symbol: HashMap<String, Vec<Candle>> = HashMap::new();
        for (symbol, candles) in series {
            let Some(key) = normalize_symbol(&symbol) else {
                continue;
            };
            candles_by_symbol.entry(key).or_default().extend(candles);
        }
        for candles in candles_by_symbol.values_mut() {
            candles.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        }
        candles_by_symbol.retain(|_, candles| !candles.is_empty());

        if candles_by_symbol.is_empty() {
            return Err(anyhow!("Market data has no usable symbols or candles"));
        }

        let mut symbols: Vec<String> = candles_by_symbol.keys().cloned().collect();
        symbols.sort();

        Ok(Self {
            interval: interval.to_string(),
            symbols: Arc::new(symbols),
            candles_by_symbol: Arc::new(candles_by_symbol),
        })
    }

    pub fn load_json<P: AsRef<Path>>(path: P, interval: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open candle file at {}", path.display()))?;
        let parsed: MarketDataFile = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid candle JSON in {}", path.display()))?;

        let series = match parsed {
            MarketDataFile::Grouped(series) => series,
            MarketDataFile::Rows(rows) => group_rows_by_symbol(rows),
        };
        let data = Self::from_series(interval, series)?;
        info!(
            "Loaded {} candles for {} symbols from {}",
            data.candle_count(),
            data.symbols.len(),
            path.display()
        );
        Ok(data)
    }

    /// Loads a bincode snapshot written by [`MarketData::save_snapshot`].
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| {
            format!("Failed to open market data snapshot at {}", path.display())
        })?;
        let reader = BufReader::new(file);
        let snapshot: MarketDataSnapshot =
            bincode::deserialize_from(reader).context("Snapshot decode failed")?;

        if snapshot.version != MARKET_DATA_SNAPSHOT_VERSION {
            return Err(anyhow!(
                "Market data snapshot version mismatch (found {}, expected {})",
                snapshot.version,
                MARKET_DATA_SNAPSHOT_VERSION
            ));
        }

        info!(
            "Loaded market data snapshot generated at {} from {}",
            snapshot.generated_at,
            path.display()
        );
        Self::from_series(&snapshot.interval, snapshot.series.into_iter().collect())
    }

    /// Picks the loader from the file extension: `.bin` is a snapshot,
    /// anything else JSON.
    pub fn load<P: AsRef<Path>>(path: P, interval: &str) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("bin") => Self::load_snapshot(path),
            _ => Self::load_json(path, interval),
        }
    }

    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create snapshot directory {}", parent.display())
                })?;
            }
        }

        let file = File::create(path).with_context(|| {
            format!(
                "Unable to create market data snapshot at {}",
                path.display()
            )
        })?;
        let mut writer = BufWriter::new(file);
        let snapshot = MarketDataSnapshot {
            version: MARKET_DATA_SNAPSHOT_VERSION,
            generated_at: Utc::now(),
            interval: self.interval.clone(),
            series: self
                .candles_by_symbol
                .iter()
                .map(|(symbol, candles)| (symbol.clone(), candles.clone()))
                .collect(),
        };
        bincode::serialize_into(&mut writer, &snapshot)
            .context("Failed to serialize market data snapshot")?;
        writer
            .flush()
            .context("Failed to flush market data snapshot to disk")?;
        Ok(())
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn candles(&self, symbol: &str) -> Option<&[Candle]> {
        let key = normalize_symbol(symbol)?;
        self.candles_by_symbol.get(&key).map(|c| c.as_slice())
    }

    pub fn candle_count(&self) -> usize {
        self.candles_by_symbol.values().map(|c| c.len()).sum()
    }
}

impl CandleSource for MarketData {
    fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        lookback: Option<usize>,
    ) -> Result<Vec<Candle>> {
        if interval != self.interval {
            return Err(anyhow!(
                "Interval {} requested but market data holds {}",
                interval,
                self.interval
            ));
        }
        let candles = self
            .candles(symbol)
            .ok_or_else(|| anyhow!("No candles available for {}", symbol))?;
        let skip = match lookback {
            Some(count) => candles.len().saturating_sub(count),
            None => 0,
        };
        Ok(candles[skip..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(count: i64, base: f64) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let close = base + i as f64;
                Candle {
                    timestamp: start + Duration::days(i),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: Some(10_000.0),
                }
            })
            .collect()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("signalcraft-{}-{}", std::process::id(), name))
    }

    #[test]
    fn fetch_respects_lookback_and_interval() {
        let mut map = HashMap::new();
        let mut reversed = series(10, 100.0);
        reversed.reverse();
        map.insert("aaa".to_string(), reversed);
        let data = MarketData::from_series("1d", map).unwrap();

        assert_eq!(data.symbols(), &["AAA".to_string()]);
        let last_three = data.fetch_candles("AAA", "1d", Some(3)).unwrap();
        assert_eq!(last_three.len(), 3);
        assert_eq!(last_three[2].close, 109.0);
        assert!(last_three[0].timestamp < last_three[1].timestamp);

        assert_eq!(data.fetch_candles("aaa", "1d", None).unwrap().len(), 10);
        assert!(data.fetch_candles("AAA", "1h", None).is_err());
        assert!(data.fetch_candles("ZZZ", "1d", None).is_err());
    }

    #[test]
    fn loads_grouped_and_row_json() {
        let grouped_path = temp_path("grouped.json");
        let mut map = HashMap::new();
        map.insert("AAA".to_string(), series(5, 10.0));
        fs::write(&grouped_path, serde_json::to_string(&map).unwrap()).unwrap();
        let grouped = MarketData::load_json(&grouped_path, "1d").unwrap();
        assert_eq!(grouped.candle_count(), 5);

        let rows_path = temp_path("rows.json");
        let rows: Vec<CandleRow> = series(4, 20.0)
            .into_iter()
            .map(|c| CandleRow {
                symbol: "bbb".to_string(),
                timestamp: c.timestamp,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
            })
            .collect();
        fs::write(&rows_path, serde_json::to_string(&rows).unwrap()).unwrap();
        let from_rows = MarketData::load_json(&rows_path, "1d").unwrap();
        assert_eq!(from_rows.symbols(), &["BBB".to_string()]);

        fs::remove_file(grouped_path).ok();
        fs::remove_file(rows_path).ok();
    }

    #[test]
    fn snapshot_round_trip_preserves_series() {
        let path = temp_path("snapshot.bin");
        let mut map = HashMap::new();
        map.insert("AAA".to_string(), series(30, 50.0));
        map.insert("BBB".to_string(), series(12, 7.5));
        let data = MarketData::from_series("1h", map).unwrap();
        data.save_snapshot(&path).unwrap();

        let restored = MarketData::load(&path, "ignored").unwrap();
        assert_eq!(restored.interval(), "1h");
        assert_eq!(restored.symbols(), data.symbols());
        assert_eq!(restored.candles("AAA"), data.candles("AAA"));
        assert_eq!(restored.candles("BBB"), data.candles("BBB"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn empty_market_data_is_rejected() {
        assert!(MarketData::from_series("1d", HashMap::new()).is_err());
        let mut map = HashMap::new();
        map.insert("  ".to_string(), series(3, 1.0));
        assert!(MarketData::from_series("1d", map).is_err());
    }
}
