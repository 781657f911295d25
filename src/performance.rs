use crate::models::*;
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub struct PerformanceCalculator;

impl PerformanceCalculator {
    /// Builds the summary for a set of simulated trades. Profit statistics
    /// only cover closed trades; OPEN trades are counted but never realized.
    pub fn summarize(
        mut trades: Vec<BacktestTrade>,
        rejected_candles: u32,
        truncated: bool,
    ) -> BacktestSummary {
        trades.sort_by(|a, b| {
            a.entry_time
                .cmp(&b.entry_time)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        let mut profitable_trades = 0u32;
        let mut loss_trades = 0u32;
        let mut open_trades = 0u32;
        let mut closed_pnls = Vec::with_capacity(trades.len());
        let mut closed_pnl_percents = Vec::with_capacity(trades.len());
        let mut symbol_profit: BTreeMap<String, f64> = BTreeMap::new();

        for trade in &trades {
            let entry = symbol_profit.entry(trade.symbol.clone()).or_insert(0.0);
            match trade.trade.result {
                TradeOutcome::Win => profitable_trades += 1,
                TradeOutcome::Loss => loss_trades += 1,
                TradeOutcome::Open => {
                    open_trades += 1;
                    continue;
                }
            }
            let pnl = trade.trade.profit_usd.unwrap_or(0.0);
            *entry += pnl;
            closed_pnls.push(pnl);
            closed_pnl_percents.push(trade.trade.profit_percent.unwrap_or(0.0));
        }

        let closed = profitable_trades + loss_trades;
        let win_rate = if closed > 0 {
            profitable_trades as f64 / closed as f64 * 100.0
        } else {
            0.0
        };

        let cumulative_profit = Self::cumulative_timeline(&trades);
        let max_drawdown_usd = Self::calculate_max_drawdown(&cumulative_profit);
        let total_profit_usd: f64 = closed_pnls.iter().copied().filter(|v| v.is_finite()).sum();

        BacktestSummary {
            profitable_trades,
            loss_trades,
            open_trades,
            total_trades: trades.len() as u32,
            win_rate,
            avg_profit_per_trade: Self::average(&closed_pnls),
            median_profit_per_trade: Self::median(&closed_pnls),
            total_profit_usd,
            best_trade_usd: Self::extreme(&closed_pnls, f64::max),
            worst_trade_usd: Self::extreme(&closed_pnls, f64::min),
            max_drawdown_usd,
            profit_ratio: Self::calculate_profit_ratio(&closed_pnl_percents),
            symbol_profit,
            cumulative_profit,
            trades,
            rejected_candles,
            truncated,
        }
    }

    /// Combines per-symbol summaries into one, recomputing every statistic.
    pub fn merge(summaries: Vec<BacktestSummary>) -> BacktestSummary {
        let mut trades = Vec::new();
        let mut rejected_candles = 0u32;
        let mut truncated = false;
        let mut symbols = Vec::new();
        for summary in summaries {
            rejected_candles += summary.rejected_candles;
            truncated |= summary.truncated;
            symbols.extend(summary.symbol_profit.into_keys());
            trades.extend(summary.trades);
        }

        let mut merged = Self::summarize(trades, rejected_candles, truncated);
        for symbol in symbols {
            merged.symbol_profit.entry(symbol).or_insert(0.0);
        }
        merged
    }

    /// Closed trades ordered by exit time with the running profit total.
    fn cumulative_timeline(trades: &[BacktestTrade]) -> Vec<ProfitPoint> {
        let mut closed: Vec<(&BacktestTrade, chrono::DateTime<chrono::Utc>, f64)> = trades
            .iter()
            .filter_map(|trade| {
                let exit_time = trade.trade.exit_time?;
                let pnl = trade.trade.profit_usd?;
                Some((trade, exit_time, pnl))
            })
            .collect();
        closed.sort_by(|a, b| {
            a.1.cmp(&b.1)
                .then_with(|| a.0.symbol.cmp(&b.0.symbol))
                .then_with(|| a.0.entry_time.cmp(&b.0.entry_time))
        });

        let mut running = 0.0;
        closed
            .into_iter()
            .map(|(trade, exit_time, pnl)| {
                running += pnl;
                ProfitPoint {
                    timestamp: exit_time,
                    symbol: trade.symbol.clone(),
                    profit_usd: pnl,
                    cumulative_profit_usd: running,
                }
            })
            .collect()
    }

    fn average(values: &[f64]) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;

        for value in values.iter().copied() {
            if value.is_finite() {
                sum += value;
                count += 1;
            }
        }

        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    fn median(values: &[f64]) -> f64 {
        let mut filtered: Vec<f64> = values
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .collect();

        if filtered.is_empty() {
            return 0.0;
        }

        filtered.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = filtered.len() / 2;

        if filtered.len() % 2 == 0 {
            (filtered[mid - 1] + filtered[mid]) / 2.0
        } else {
            filtered[mid]
        }
    }

    fn extreme(values: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
        values
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .reduce(pick)
            .unwrap_or(0.0)
    }

    /// Mean per-trade return over its standard deviation.
    pub fn calculate_profit_ratio(trade_returns: &[f64]) -> f64 {
        let returns: Vec<f64> = trade_returns
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .collect();
        if returns.len() < 2 {
            return 0.0;
        }

        let mean_return = returns.clone().mean();
        let std_dev = returns.std_dev();

        if !std_dev.is_finite() || std_dev == 0.0 {
            return 0.0;
        }

        mean_return / std_dev
    }

    /// Largest fall of the cumulative profit from a prior peak; the curve
    /// starts flat at zero.
    fn calculate_max_drawdown(timeline: &[ProfitPoint]) -> f64 {
        let mut max_drawdown = 0.0;
        let mut peak_value = 0.0;

        for point in timeline {
            let value = point.cumulative_profit_usd;
            if value > peak_value {
                peak_value = value;
            } else {
                let drawdown = peak_value - value;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }

        max_drawdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day(offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap() + Duration::days(offset)
    }

    fn trade(symbol: &str, entry: i64, exit: Option<i64>, pnl: Option<f64>) -> BacktestTrade {
        let result = match pnl {
            Some(value) if value > 0.0 => TradeOutcome::Win,
            Some(_) => TradeOutcome::Loss,
            None => TradeOutcome::Open,
        };
        BacktestTrade {
            symbol: symbol.to_string(),
            entry_time: day(entry),
            confidence: 70,
            pattern: None,
            trade: TradeResult {
                direction: TradeDirection::Buy,
                entry_price: 100.0,
                stop_loss: 95.0,
                take_profit: 110.0,
                exit_price: pnl.map(|p| 100.0 + p / 10.0),
                exit_time: exit.map(day),
                result,
                profit_usd: pnl,
                profit_percent: pnl.map(|p| p / 10.0),
                bars_held: 1,
            },
        }
    }

    #[test]
    fn summarizes_wins_losses_and_open_trades() {
        let trades = vec![
            trade("AAA", 0, Some(2), Some(100.0)),
            trade("BBB", 1, Some(3), Some(-50.0)),
            trade("AAA", 4, Some(5), Some(100.0)),
            trade("BBB", 6, None, None),
        ];
        let summary = PerformanceCalculator::summarize(trades, 2, false);

        assert_eq!(summary.total_trades, 4);
        assert_eq!(summary.profitable_trades, 2);
        assert_eq!(summary.loss_trades, 1);
        assert_eq!(summary.open_trades, 1);
        assert!((summary.win_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((summary.avg_profit_per_trade - 50.0).abs() < 1e-9);
        assert!((summary.median_profit_per_trade - 100.0).abs() < 1e-9);
        assert!((summary.total_profit_usd - 150.0).abs() < 1e-9);
        assert!((summary.best_trade_usd - 100.0).abs() < 1e-9);
        assert!((summary.worst_trade_usd + 50.0).abs() < 1e-9);
        assert!((summary.max_drawdown_usd - 50.0).abs() < 1e-9);
        assert_eq!(summary.rejected_candles, 2);

        assert!((summary.symbol_profit["AAA"] - 200.0).abs() < 1e-9);
        assert!((summary.symbol_profit["BBB"] + 50.0).abs() < 1e-9);

        let cumulative: Vec<f64> = summary
            .cumulative_profit
            .iter()
            .map(|p| p.cumulative_profit_usd)
            .collect();
        assert_eq!(cumulative, vec![100.0, 50.0, 150.0]);
        assert!(summary
            .cumulative_profit
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn empty_summary_is_zeroed() {
        let summary = PerformanceCalculator::summarize(Vec::new(), 0, true);
        assert_eq!(summary.total_trades, 0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.profit_ratio, 0.0);
        assert!(summary.cumulative_profit.is_empty());
        assert!(summary.truncated);
    }

    #[test]
    fn merge_recomputes_across_symbols() {
        let first = PerformanceCalculator::summarize(
            vec![trade("AAA", 0, Some(5), Some(40.0))],
            1,
            false,
        );
        let second = PerformanceCalculator::summarize(
            vec![trade("BBB", 1, Some(2), Some(-10.0))],
            0,
            true,
        );
        let empty = PerformanceCalculator::summarize(Vec::new(), 3, false);

        let merged = PerformanceCalculator::merge(vec![first, second, empty]);
        assert_eq!(merged.total_trades, 2);
        assert_eq!(merged.rejected_candles, 4);
        assert!(merged.truncated);
        assert_eq!(merged.cumulative_profit[0].symbol, "BBB");
        assert!((merged.cumulative_profit[1].cumulative_profit_usd - 30.0).abs() < 1e-9);
        assert!((merged.win_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn profit_ratio_is_mean_over_std_dev() {
        let ratio = PerformanceCalculator::calculate_profit_ratio(&[1.0, 3.0]);
        // mean 2, sample std dev sqrt(2)
        assert!((ratio - 2.0 / 2.0_f64.sqrt()).abs() < 1e-9);
        assert_eq!(PerformanceCalculator::calculate_profit_ratio(&[5.0]), 0.0);
        assert_eq!(PerformanceCalculator::calculate_profit_ratio(&[2.0, 2.0]), 0.0);
    }
}
