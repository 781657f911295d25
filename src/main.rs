use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::info;
use signalcraft::commands::{self, backtest, evaluate, export_snapshot};
use signalcraft::data_context::DEFAULT_INTERVAL;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "signalcraft")]
#[command(about = "Candlestick signal scoring and OHLC backtesting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    commands::parse_datetime_arg(value).map_err(|err| err.to_string())
}

#[derive(Subcommand)]
enum Commands {
    /// Score the latest candle of one symbol and print the signal as JSON
    Evaluate {
        /// Candle file (JSON, or a .bin snapshot)
        #[arg(long, value_name = "PATH")]
        data: PathBuf,
        /// Symbol to evaluate
        #[arg(long)]
        symbol: String,
        /// Candle interval label
        #[arg(long, default_value = DEFAULT_INTERVAL)]
        interval: String,
        /// JSON object of tuning parameters
        #[arg(long, value_name = "PATH")]
        params: Option<PathBuf>,
    },
    /// Replay history through the signal engine and print the summary as JSON
    Backtest {
        /// Candle file (JSON, or a .bin snapshot)
        #[arg(long, value_name = "PATH")]
        data: PathBuf,
        /// Comma separated symbols (defaults to every symbol in the file)
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,
        /// Candle interval label
        #[arg(long, default_value = DEFAULT_INTERVAL)]
        interval: String,
        /// First candle eligible for entries (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_date)]
        start: Option<DateTime<Utc>>,
        /// Last candle of the window (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_date)]
        end: Option<DateTime<Utc>>,
        /// Minimum confidence (0-100) required to open a trade
        #[arg(long)]
        min_confidence: Option<u32>,
        /// Notional USD per trade
        #[arg(long)]
        position_size: Option<f64>,
        /// Resolve candles that touch both stop and target as wins
        #[arg(long)]
        optimistic: bool,
        /// JSON object of tuning parameters
        #[arg(long, value_name = "PATH")]
        params: Option<PathBuf>,
    },
    /// Convert a JSON candle file into a bincode snapshot
    ExportSnapshot {
        /// Source JSON candle file
        #[arg(long, value_name = "PATH")]
        data: PathBuf,
        /// Destination file for the snapshot
        #[arg(short, long = "output", value_name = "PATH")]
        output: PathBuf,
        /// Candle interval label stored in the snapshot
        #[arg(long, default_value = DEFAULT_INTERVAL)]
        interval: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting signalcraft. Not financial advice. Backtests do not predict future results.");

    match cli.command {
        Commands::Evaluate {
            data,
            symbol,
            interval,
            params,
        } => {
            evaluate::run(&data, &symbol, &interval, params.as_deref())?;
        }
        Commands::Backtest {
            data,
            symbols,
            interval,
            start,
            end,
            min_confidence,
            position_size,
            optimistic,
            params,
        } => {
            backtest::run(&backtest::BacktestOptions {
                data,
                symbols,
                interval,
                start,
                end,
                min_confidence,
                position_size,
                optimistic,
                params,
                show_progress: true,
            })?;
        }
        Commands::ExportSnapshot {
            data,
            output,
            interval,
        } => {
            export_snapshot::run(&data, &output, &interval)?;
        }
    }

    Ok(())
}
