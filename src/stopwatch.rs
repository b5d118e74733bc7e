use std::time::Duration;
use tdigest::TDigest;

pub type DurationMicros = f64;

/// Collects recommendation request durations for the status page.
#[derive(Clone, Default)]
pub struct Stopwatch {
    request_durations: Vec<DurationMicros>,
}

impl Stopwatch {
    pub fn new() -> Stopwatch {
        Stopwatch {
            request_durations: Vec::new(),
        }
    }

    pub fn record(&mut self, duration: Duration) {
        self.request_durations.push(duration.as_micros() as f64);
    }

    pub fn qty_requests(&self) -> usize {
        self.request_durations.len()
    }

    pub fn percentile_in_micros(&self, q: f64) -> f64 {
        let t_digest = TDigest::new_with_size(100);
        let sorted_digest = t_digest.merge_unsorted(self.request_durations.clone());
        sorted_digest.estimate_quantile(q)
    }
}

#[cfg(test)]
mod stopwatch_test {
    use super::*;

    #[test]
    fn should_track_recorded_durations() {
        let mut stopwatch = Stopwatch::new();
        for millis in 1..=100 {
            stopwatch.record(Duration::from_millis(millis));
        }

        assert_eq!(100, stopwatch.qty_requests());

        let median = stopwatch.percentile_in_micros(0.5);
        assert!(median >= 40_000.0 && median <= 60_000.0);

        let p100 = stopwatch.percentile_in_micros(1.0);
        assert!(p100 >= 99_000.0 && p100 <= 100_000.0);
    }
}
