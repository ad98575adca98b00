// Fixed-duration OHLC bucketing of an ordered sample stream.
use chrono::Duration;
use shared::models::{Candle, Sample, TimeFrame};

/// Folds samples into candles, one per bucket that received at least one
/// sample.
///
/// A bucket starts at the timestamp of the sample that opened it (not at a
/// grid boundary) and spans `granularity` inclusive: a sample exactly
/// `granularity` after the bucket start still belongs to it.
#[derive(Debug, Clone)]
pub struct PeriodAggregator {
    granularity: Duration,
    // The bucket start is always `current.period_start`.
    current: Option<Candle>,
    closed: Vec<Candle>,
}

impl PeriodAggregator {
    pub fn new(granularity: TimeFrame) -> Self {
        Self::with_duration(granularity.duration())
    }

    pub fn with_duration(granularity: Duration) -> Self {
        PeriodAggregator {
            granularity,
            current: None,
            closed: Vec::new(),
        }
    }

    pub fn granularity(&self) -> Duration {
        self.granularity
    }

    /// Samples must arrive in non-decreasing timestamp order.
    pub fn feed(&mut self, sample: &Sample) {
        let starts_new_bucket = match &self.current {
            Some(candle) => sample.timestamp - candle.period_start > self.granularity,
            None => true,
        };

        if starts_new_bucket {
            // The sample that crosses the boundary only seeds the next candle.
            if let Some(done) = self.current.take() {
                tracing::debug!(
                    period_start = %done.period_start,
                    period_end = %done.period_end,
                    open = done.open,
                    close = done.close,
                    volume = done.volume,
                    "Closed candle"
                );
                self.closed.push(done);
            }
            self.current = Some(Candle::open_at(sample));
            return;
        }

        if let Some(candle) = self.current.as_mut() {
            candle.close = sample.price;
            candle.max = candle.max.max(sample.price);
            candle.min = candle.min.min(sample.price);
            candle.volume += sample.volume_field;
            candle.period_end = sample.timestamp;
        }
    }

    pub fn feed_all<'a, I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        for sample in samples {
            self.feed(sample);
        }
    }

    /// Candles already closed; the open one is not included.
    pub fn closed(&self) -> &[Candle] {
        &self.closed
    }

    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// Every candle built so far, in bucket order. The open bucket is
    /// included as is; no empty trailing bucket is synthesized.
    pub fn finish(mut self) -> Vec<Candle> {
        if let Some(last) = self.current.take() {
            self.closed.push(last);
        }
        self.closed
    }
}
