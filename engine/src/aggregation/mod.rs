// Tick-to-candle aggregation stages
pub mod period;
pub mod volume_window;

pub use period::PeriodAggregator;
pub use volume_window::VolumeWindowResolver;

use shared::models::Sample;

use crate::error::Result;

/// Turns the volume field of a raw sample into an incremental volume before
/// the sample reaches the period aggregator.
pub trait VolumeStage: Send {
    fn name(&self) -> &str;
    fn apply(&mut self, sample: &Sample) -> Result<Sample>;

    fn stats(&self) -> StageStats {
        StageStats::default()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    /// Samples resolved to zero for lack of a full window of history.
    pub warmup_samples: usize,
    /// Records whose volume was patched after a cumulative drop.
    pub backpatches: usize,
}

/// For feeds whose volume field already is per-sample volume.
#[derive(Debug, Default, Clone, Copy)]
pub struct IncrementalVolume;

impl VolumeStage for IncrementalVolume {
    fn name(&self) -> &str {
        "incremental"
    }

    fn apply(&mut self, sample: &Sample) -> Result<Sample> {
        Ok(*sample)
    }
}

impl VolumeStage for VolumeWindowResolver {
    fn name(&self) -> &str {
        "rolling-window"
    }

    fn apply(&mut self, sample: &Sample) -> Result<Sample> {
        self.resolve(sample)
    }

    fn stats(&self) -> StageStats {
        StageStats {
            warmup_samples: self.warmup_samples(),
            backpatches: self.backpatches(),
        }
    }
}
