// Recovers per-sample trade volume from a rolling cumulative volume feed.
//
// Each sample of such a feed reports the volume traded over the trailing
// window ending at its timestamp. Between two samples new volume enters the
// window and old volume leaves it, so the raw difference has to be corrected
// by the contribution of the record that ages out.
use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use shared::models::Sample;

use crate::error::{EngineError, Result};
use crate::models::VolumeHistoryRecord;

#[derive(Debug, Clone)]
pub struct VolumeWindowResolver {
    window: Duration,
    evict_expired: bool,
    history: VecDeque<VolumeHistoryRecord>,
    // Arrival index of `history[0]`; non-zero only once records were evicted.
    evicted: usize,
    first_seen: Option<DateTime<Utc>>,
    warmup_samples: usize,
    backpatches: usize,
}

impl VolumeWindowResolver {
    /// `evict_expired` drops records that no later sample can reach. Results
    /// are identical either way; only memory use differs.
    pub fn new(window: Duration, evict_expired: bool) -> Self {
        VolumeWindowResolver {
            window,
            evict_expired,
            history: VecDeque::new(),
            evicted: 0,
            first_seen: None,
            warmup_samples: 0,
            backpatches: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns `sample` with its cumulative volume replaced by the volume that
    /// entered the window since the previous sample.
    ///
    /// Samples seen before a full window of history exists resolve to zero.
    /// Timestamps must be non-decreasing; this is not re-checked here.
    pub fn resolve(&mut self, sample: &Sample) -> Result<Sample> {
        let volume_24h = sample.volume_field;
        let cutoff = sample.timestamp - self.window;

        let covered = matches!(self.first_seen, Some(first) if cutoff >= first);
        let moment_volume = if covered {
            self.resolve_covered(cutoff, volume_24h)?
        } else {
            self.warmup_samples += 1;
            tracing::trace!(timestamp = %sample.timestamp, "Volume window not yet covered, resolving to zero");
            0.0
        };

        self.first_seen.get_or_insert(sample.timestamp);
        self.history
            .push_back(VolumeHistoryRecord::new(sample.timestamp, volume_24h, moment_volume));

        Ok(Sample {
            volume_field: moment_volume,
            ..*sample
        })
    }

    fn resolve_covered(&mut self, cutoff: DateTime<Utc>, volume_24h: f64) -> Result<f64> {
        let (first, previous) = match (self.history.front(), self.history.back()) {
            (Some(first), Some(last)) => (first.timestamp, *last),
            _ => return Ok(0.0),
        };

        // Earliest record at or after the cutoff: the one leaving the window.
        let j = self.history.partition_point(|record| record.timestamp < cutoff);
        if j == self.history.len() {
            return Err(EngineError::WindowSearch {
                cutoff,
                first,
                last: previous.timestamp,
                len: self.history.len(),
            });
        }

        let aging_out = &mut self.history[j];
        let raw = volume_24h - previous.volume_24h + aging_out.moment_volume;

        let moment_volume = if raw >= 0.0 {
            raw
        } else {
            // The feed dropped more than the aging-out record explains. Push the
            // deficit back onto that record, at most once.
            if aging_out.is_unattributed() {
                aging_out.moment_volume = -raw;
                self.backpatches += 1;
                tracing::debug!(
                    record = self.evicted + j,
                    record_timestamp = %aging_out.timestamp,
                    deficit = -raw,
                    "Backpatched aging-out record after cumulative volume drop"
                );
            } else {
                tracing::debug!(
                    record = self.evicted + j,
                    raw,
                    "Cumulative volume drop against an already attributed record, clamping to zero"
                );
            }
            0.0
        };

        if self.evict_expired && j > 0 {
            self.history.drain(..j);
            self.evicted += j;
        }

        Ok(moment_volume)
    }

    /// Number of samples processed, evicted ones included.
    pub fn history_len(&self) -> usize {
        self.evicted + self.history.len()
    }

    pub fn retained_len(&self) -> usize {
        self.history.len()
    }

    /// History record by arrival index. `None` for evicted or unknown indices.
    pub fn record(&self, index: usize) -> Option<&VolumeHistoryRecord> {
        index
            .checked_sub(self.evicted)
            .and_then(|offset| self.history.get(offset))
    }

    pub fn warmup_samples(&self) -> usize {
        self.warmup_samples
    }

    pub fn backpatches(&self) -> usize {
        self.backpatches
    }
}
