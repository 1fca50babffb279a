use std::collections::VecDeque;

use crate::sample::Sample;

/// Fixed-length FIFO of the most recent samples, kept as parallel time and
/// angle sequences. Starts full of zeros so the curve always has `capacity`
/// points.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    times: VecDeque<f64>,
    angles: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            times: std::iter::repeat(0.0).take(capacity).collect(),
            angles: std::iter::repeat(0.0).take(capacity).collect(),
            capacity,
        }
    }

    /// Drop the oldest sample and append `sample` at the end.
    pub fn push(&mut self, sample: Sample) {
        if self.capacity == 0 {
            return;
        }
        self.times.pop_front();
        self.angles.pop_front();
        self.times.push_back(sample.time_s);
        self.angles.push_back(sample.angle);
    }

    pub fn latest(&self) -> Option<Sample> {
        Some(Sample {
            time_s: *self.times.back()?,
            angle: *self.angles.back()?,
        })
    }

    /// (time, angle) pairs, oldest first.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.angles.iter().copied())
    }

    /// Span of the time axis, widened to at least one second so a window of
    /// identical timestamps still gives the chart a usable range.
    pub fn time_bounds(&self) -> (f64, f64) {
        let (lo, hi) = self
            .times
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| {
                (lo.min(t), hi.max(t))
            });
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        if hi - lo < 1.0 {
            (lo, lo + 1.0)
        } else {
            (lo, hi)
        }
    }
}
