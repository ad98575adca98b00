// Read-only views over finished candles for charting and diagnostics.
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::{Candle, TimeFrame};

use crate::config::EngineSettings;
use crate::error::Result;

const LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One diagnostic line: time range, body and tail sizes, direction.
pub fn candle_line(candle: &Candle) -> String {
    format!(
        "{} - {} body={:.4} upper={:.4} lower={:.4} rising={}",
        candle.period_start.format(LINE_TIME_FORMAT),
        candle.period_end.format(LINE_TIME_FORMAT),
        candle.body_size(),
        candle.upper_tail(),
        candle.lower_tail(),
        candle.is_rising()
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSummary {
    pub title: String,
    pub candles: usize,
    pub min_rate: f64,
    pub max_rate: f64,
    pub min_volume: f64,
    pub max_volume: f64,
}

impl ChartSummary {
    /// `None` when there is nothing to chart.
    pub fn from_candles(candles: &[Candle], settings: &EngineSettings) -> Option<Self> {
        let first = candles.first()?;
        let init = (first.min, first.max, first.volume, first.volume);
        let (min_rate, max_rate, min_volume, max_volume) =
            candles.iter().fold(init, |(lo, hi, vlo, vhi), c| {
                (lo.min(c.min), hi.max(c.max), vlo.min(c.volume), vhi.max(c.volume))
            });

        Some(ChartSummary {
            title: chart_title(settings),
            candles: candles.len(),
            min_rate,
            max_rate,
            min_volume,
            max_volume,
        })
    }
}

pub fn chart_title(settings: &EngineSettings) -> String {
    let (hours, minutes) = settings.granularity.hours_minutes();
    format!(
        "Exchange: {} ({} days, {}h:{}m granularity)",
        settings.source.exchange.as_deref().unwrap_or("any"),
        settings.source.days,
        hours,
        minutes
    )
}

/// Volume bars on the bucket grid: each candle's volume followed by a zero
/// for every whole empty bucket before the next candle starts.
pub fn volume_series(candles: &[Candle], granularity: TimeFrame) -> Vec<f64> {
    let step = granularity.as_seconds();
    let mut series = Vec::with_capacity(candles.len());
    for (idx, candle) in candles.iter().enumerate() {
        series.push(candle.volume);
        if let Some(next) = candles.get(idx + 1) {
            let gap = (next.period_start - candle.period_start).num_seconds() / step;
            let empty = usize::try_from(gap - 1).unwrap_or(0);
            series.extend(std::iter::repeat(0.0).take(empty));
        }
    }
    series
}

#[derive(Debug, Serialize)]
struct CandleRow {
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    open: f64,
    close: f64,
    min: f64,
    max: f64,
    volume: f64,
    body_size: f64,
    upper_tail: f64,
    lower_tail: f64,
    is_rising: bool,
}

impl From<&Candle> for CandleRow {
    fn from(c: &Candle) -> Self {
        CandleRow {
            period_start: c.period_start,
            period_end: c.period_end,
            open: c.open,
            close: c.close,
            min: c.min,
            max: c.max,
            volume: c.volume,
            body_size: c.body_size(),
            upper_tail: c.upper_tail(),
            lower_tail: c.lower_tail(),
            is_rising: c.is_rising(),
        }
    }
}

pub fn write_candles_csv<W: Write>(writer: W, candles: &[Candle]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for candle in candles {
        wtr.serialize(CandleRow::from(candle))?;
    }
    wtr.flush()?;
    Ok(())
}
