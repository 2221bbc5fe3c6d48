//! Rolling success/failure window.
//!
//! A fixed ring of time buckets. Each bucket remembers which tick it was
//! last written for; a bucket whose tick is stale is cleared on the next
//! write and ignored on read, so the window advances lazily without a timer.

use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    tick: u64,
    successes: u64,
    failures: u64,
}

/// Aggregated counts over the live part of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub successes: u64,
    pub failures: u64,
}

impl WindowCounts {
    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }

    /// Failure percentage, rounded down. Zero for an empty window.
    pub fn error_percent(&self) -> u8 {
        match self.total() {
            0 => 0,
            total => (self.failures * 100 / total) as u8,
        }
    }

    /// True when the failure rate is at or above `percent`.
    pub fn exceeds(&self, percent: u8) -> bool {
        self.total() > 0 && self.failures * 100 >= u64::from(percent) * self.total()
    }
}

/// Time-bucketed counters covering the last `buckets * bucket_width`.
#[derive(Debug)]
pub struct RollingWindow {
    buckets: Box<[Bucket]>,
    bucket_width: Duration,
    origin: Instant,
}

impl RollingWindow {
    pub fn new(buckets: usize, bucket_width: Duration) -> Self {
        Self {
            buckets: vec![Bucket::default(); buckets.max(1)].into_boxed_slice(),
            bucket_width: bucket_width.max(Duration::from_millis(1)),
            origin: Instant::now(),
        }
    }

    fn tick(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin).as_millis();
        (elapsed / self.bucket_width.as_millis()) as u64
    }

    fn current(&mut self, now: Instant) -> &mut Bucket {
        let tick = self.tick(now);
        let len = self.buckets.len() as u64;
        let bucket = &mut self.buckets[(tick % len) as usize];
        if bucket.tick != tick {
            *bucket = Bucket {
                tick,
                ..Bucket::default()
            };
        }
        bucket
    }

    pub fn record_success(&mut self, now: Instant) {
        self.current(now).successes += 1;
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.current(now).failures += 1;
    }

    /// Sum of all buckets still inside the window at `now`.
    pub fn counts(&self, now: Instant) -> WindowCounts {
        let tick = self.tick(now);
        let len = self.buckets.len() as u64;
        self.buckets
            .iter()
            .filter(|b| b.tick <= tick && tick - b.tick < len)
            .fold(WindowCounts::default(), |acc, b| WindowCounts {
                successes: acc.successes + b.successes,
                failures: acc.failures + b.failures,
            })
    }

    pub fn reset(&mut self) {
        self.buckets.fill(Bucket::default());
    }
}
