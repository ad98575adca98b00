use chrono::{DateTime, Utc};
use serde::Serialize;

/// One entry of the volume resolver's history, kept per processed sample.
///
/// `moment_volume` may be rewritten once after the fact, when a later sample
/// reports a cumulative drop that only this record can explain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeHistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub volume_24h: f64,
    pub moment_volume: f64,
}

impl VolumeHistoryRecord {
    pub fn new(timestamp: DateTime<Utc>, volume_24h: f64, moment_volume: f64) -> Self {
        VolumeHistoryRecord {
            timestamp,
            volume_24h,
            moment_volume,
        }
    }

    /// True while no volume has been attributed to this record, either by its
    /// own resolution or by a backpatch.
    pub fn is_unattributed(&self) -> bool {
        self.moment_volume == 0.0
    }
}
