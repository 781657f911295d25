use crate::data_context::MarketData;
use anyhow::Result;
use log::info;
use std::path::Path;

pub fn run(data_path: &Path, output_path: &Path, interval: &str) -> Result<()> {
    info!(
        "Generating market data snapshot at {} from {}",
        output_path.display(),
        data_path.display()
    );

    let market_data = MarketData::load_json(data_path, interval)?;
    market_data.save_snapshot(output_path)?;

    info!(
        "Market data snapshot with {} symbols successfully written to {}",
        market_data.symbols().len(),
        output_path.display()
    );
    Ok(())
}
