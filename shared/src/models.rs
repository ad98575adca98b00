use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped trade observation.
///
/// `volume_field` is either an incremental volume (simple feeds) or a rolling
/// cumulative figure over the trailing window (rolling feeds), depending on
/// where the sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume_field: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, price: f64, volume_field: f64) -> Self {
        Sample {
            timestamp,
            price,
            volume_field,
        }
    }
}

/// OHLC summary of every sample that landed in one bucket, plus the
/// accumulated volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub close: f64,
    pub min: f64,
    pub max: f64,
    pub volume: f64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl Candle {
    /// A candle seeded by a single sample.
    pub fn open_at(sample: &Sample) -> Self {
        Candle {
            open: sample.price,
            close: sample.price,
            min: sample.price,
            max: sample.price,
            volume: sample.volume_field,
            period_start: sample.timestamp,
            period_end: sample.timestamp,
        }
    }

    pub fn body_size(&self) -> f64 {
        (self.open - self.close).abs()
    }

    pub fn upper_tail(&self) -> f64 {
        (self.max - self.open.max(self.close)).abs()
    }

    pub fn lower_tail(&self) -> f64 {
        (self.min - self.open.min(self.close)).abs()
    }

    pub fn is_rising(&self) -> bool {
        self.close > self.open
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeFrame {
    Minute1,
    Minute5,
    #[default]
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
}

impl TimeFrame {
    pub fn as_minutes(&self) -> i64 {
        match self {
            TimeFrame::Minute1 => 1,
            TimeFrame::Minute5 => 5,
            TimeFrame::Minute15 => 15,
            TimeFrame::Minute30 => 30,
            TimeFrame::Hour1 => 60,
            TimeFrame::Hour4 => 240,
            TimeFrame::Day1 => 1440,
        }
    }

    pub fn as_seconds(&self) -> i64 {
        self.as_minutes() * 60
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.as_minutes())
    }

    /// Whole hours and the remaining minutes, e.g. `(0, 15)` for `Minute15`.
    pub fn hours_minutes(&self) -> (i64, i64) {
        let minutes = self.as_minutes();
        (minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(open: f64, close: f64, min: f64, max: f64) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle { open, close, min, max, volume: 0.0, period_start: t, period_end: t }
    }

    #[test]
    fn test_derived_attributes_falling_candle() {
        let c = candle(105.0, 100.0, 98.0, 107.0);
        assert_eq!(c.body_size(), 5.0);
        assert_eq!(c.upper_tail(), 2.0);
        assert_eq!(c.lower_tail(), 2.0);
        assert!(!c.is_rising());
    }

    #[test]
    fn test_derived_attributes_rising_candle() {
        let c = candle(100.0, 104.0, 100.0, 104.0);
        assert_eq!(c.body_size(), 4.0);
        assert_eq!(c.upper_tail(), 0.0);
        assert_eq!(c.lower_tail(), 0.0);
        assert!(c.is_rising());
    }

    #[test]
    fn test_flat_candle_is_not_rising() {
        assert!(!candle(100.0, 100.0, 100.0, 100.0).is_rising());
    }

    #[test]
    fn test_open_at_seeds_every_field_from_sample() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let c = Candle::open_at(&Sample::new(t, 95.0, 3.0));
        assert_eq!((c.open, c.close, c.min, c.max, c.volume), (95.0, 95.0, 95.0, 95.0, 3.0));
        assert_eq!(c.period_start, t);
        assert_eq!(c.period_end, t);
    }

    #[test]
    fn test_timeframe_durations() {
        assert_eq!(TimeFrame::Minute15.duration(), Duration::minutes(15));
        assert_eq!(TimeFrame::Hour4.as_seconds(), 4 * 3600);
        assert_eq!(TimeFrame::Minute15.hours_minutes(), (0, 15));
        assert_eq!(TimeFrame::Day1.hours_minutes(), (24, 0));
        assert_eq!(TimeFrame::default(), TimeFrame::Minute15);
    }

    #[test]
    fn test_timeframe_serde_uses_variant_names() {
        let json = serde_json::to_string(&TimeFrame::Hour1).unwrap();
        assert_eq!(json, "\"Hour1\"");
        let back: TimeFrame = serde_json::from_str("\"Minute5\"").unwrap();
        assert_eq!(back, TimeFrame::Minute5);
    }
}
