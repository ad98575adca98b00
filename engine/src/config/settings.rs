// Engine settings, loaded from a JSON file or taken from defaults
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shared::models::TimeFrame;
use shared::utils::aligned_window_start;

use crate::error::{EngineError, Result};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub granularity: TimeFrame,
    /// Treat the volume field as a rolling cumulative figure and resolve it
    /// into per-sample volume before bucketing.
    pub resolve_volume: bool,
    pub volume_window_hours: u32,
    pub evict_expired: bool,
    pub source: SourceSettings,
    /// Candle CSV destination; stdout when absent.
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SourceSettings {
    pub input_path: String,
    pub exchange: Option<String>,
    pub pair: Option<String>,
    /// Length of the backfill window. 0 keeps every row.
    pub days: u32,
    /// Reference instant for the backfill window; the current time when absent.
    pub window_end: Option<DateTime<Utc>>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            granularity: TimeFrame::Minute15,
            resolve_volume: false,
            volume_window_hours: 24,
            evict_expired: false,
            source: SourceSettings::default(),
            output_path: None,
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        SourceSettings {
            input_path: "rates.csv".to_string(),
            exchange: Some("btc-e".to_string()),
            pair: Some("btc_usd".to_string()),
            days: 10,
            window_end: None,
        }
    }
}

impl EngineSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("Failed to read settings file '{}': {}", path.display(), e))
        })?;
        let settings: EngineSettings = serde_json::from_str(&raw)?;
        settings.validate()?;
        tracing::info!(path = %path.display(), granularity = ?settings.granularity, "Loaded engine settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.volume_window_hours == 0 {
            return Err(EngineError::ConfigError(
                "volume_window_hours must be greater than 0".to_string(),
            ));
        }
        if self.source.input_path.trim().is_empty() {
            return Err(EngineError::ConfigError("source.input_path must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn volume_window(&self) -> Duration {
        Duration::hours(i64::from(self.volume_window_hours))
    }

    /// Earliest sample time to keep, or `None` when no window applies.
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.source.days == 0 {
            return None;
        }
        let anchor = self.source.window_end.unwrap_or(now);
        aligned_window_start(anchor, self.granularity, self.source.days)
    }
}
