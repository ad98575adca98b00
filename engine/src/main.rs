// Engine main entry point
use std::fs::File;
use std::io::{self, BufWriter};

use anyhow::Context;
use chrono::Utc;
use engine::config::EngineSettings;
use engine::data::{RateFilter, RatesCsvLoader};
use engine::report::{self, ChartSummary};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting rates engine...");

    // Optional settings file as the only argument; defaults otherwise.
    let settings = match std::env::args().nth(1) {
        Some(path) => EngineSettings::load(&path).with_context(|| format!("loading settings from '{}'", path))?,
        None => {
            let settings = EngineSettings::default();
            settings.validate()?;
            settings
        }
    };

    let not_before = settings.window_start(Utc::now());
    let filter = RateFilter::from_source(&settings.source, not_before);
    info!(
        input = %settings.source.input_path,
        exchange = ?filter.exchange,
        pair = ?filter.pair,
        not_before = ?filter.not_before,
        resolve_volume = settings.resolve_volume,
        "Loading samples"
    );

    let samples = RatesCsvLoader::load_samples_from_csv(&settings.source.input_path, &filter)
        .map_err(|e| {
            error!(error = %e, "Failed to load samples");
            e
        })?;

    let output = engine::run(&samples, &settings).map_err(|e| {
        error!(error = %e, "Aggregation aborted");
        e
    })?;

    for candle in &output.candles {
        tracing::debug!("{}", report::candle_line(candle));
    }
    match ChartSummary::from_candles(&output.candles, &settings) {
        Some(summary) => info!(
            title = %summary.title,
            candles = summary.candles,
            min_rate = summary.min_rate,
            max_rate = summary.max_rate,
            min_volume = summary.min_volume,
            max_volume = summary.max_volume,
            "Chart summary"
        ),
        None => info!("No samples in range, nothing to chart"),
    }

    match &settings.output_path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating '{}'", path))?;
            report::write_candles_csv(BufWriter::new(file), &output.candles)?;
            info!(path = %path, candles = output.candles.len(), "Wrote candles");
        }
        None => report::write_candles_csv(io::stdout().lock(), &output.candles)?,
    }

    Ok(())
}
