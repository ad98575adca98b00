// Raw samples -> optional volume resolution -> period aggregation.
use chrono::{DateTime, Utc};
use shared::models::{Candle, Sample};

use crate::aggregation::{IncrementalVolume, PeriodAggregator, StageStats, VolumeStage, VolumeWindowResolver};
use crate::config::EngineSettings;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub candles: Vec<Candle>,
    pub samples: usize,
    pub warmup_samples: usize,
    pub backpatches: usize,
}

pub struct CandlePipeline {
    volume: Box<dyn VolumeStage>,
    aggregator: PeriodAggregator,
    last_timestamp: Option<DateTime<Utc>>,
    samples: usize,
}

impl CandlePipeline {
    pub fn new(settings: &EngineSettings) -> Self {
        let volume: Box<dyn VolumeStage> = if settings.resolve_volume {
            Box::new(VolumeWindowResolver::new(settings.volume_window(), settings.evict_expired))
        } else {
            Box::new(IncrementalVolume)
        };
        tracing::debug!(volume_stage = volume.name(), granularity = ?settings.granularity, "Built candle pipeline");

        CandlePipeline {
            volume,
            aggregator: PeriodAggregator::new(settings.granularity),
            last_timestamp: None,
            samples: 0,
        }
    }

    /// A timestamp earlier than the previous one is fatal to the run.
    pub fn feed(&mut self, sample: &Sample) -> Result<()> {
        if let Some(previous) = self.last_timestamp {
            if sample.timestamp < previous {
                return Err(EngineError::OrderingViolation {
                    index: self.samples,
                    previous,
                    current: sample.timestamp,
                });
            }
        }

        let resolved = self.volume.apply(sample)?;
        self.aggregator.feed(&resolved);
        self.last_timestamp = Some(sample.timestamp);
        self.samples += 1;
        Ok(())
    }

    pub fn feed_batch<'a, I>(&mut self, samples: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        samples.into_iter().try_for_each(|sample| self.feed(sample))
    }

    pub fn finish(self) -> PipelineOutput {
        let StageStats { warmup_samples, backpatches } = self.volume.stats();
        let candles = self.aggregator.finish();
        tracing::info!(
            samples = self.samples,
            candles = candles.len(),
            warmup_samples,
            backpatches,
            "Aggregation finished"
        );
        PipelineOutput {
            candles,
            samples: self.samples,
            warmup_samples,
            backpatches,
        }
    }
}

/// Runs a complete sample sequence through a fresh pipeline.
pub fn run(samples: &[Sample], settings: &EngineSettings) -> Result<PipelineOutput> {
    let mut pipeline = CandlePipeline::new(settings);
    pipeline.feed_batch(samples)?;
    Ok(pipeline.finish())
}
