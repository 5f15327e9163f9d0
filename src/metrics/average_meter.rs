use std::fmt;

use serde::{Serialize, Deserialize};

/// Tracks the most recent value and the running weighted mean of a scalar
/// stream (per-batch loss, per-batch accuracy, ...).
///
/// Typical lifecycle: one meter per quantity, `update` once per batch with the
/// batch size as weight, `reset` at every epoch boundary.
///
/// Reading `avg()` before any sample has been counted returns `0.0`.
/// A NaN or infinite loss is kept as is and survives a JSON round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageMeter {
    #[serde(with = "crate::math::float_serde")]
    val: f64,
    #[serde(with = "crate::math::float_serde")]
    sum: f64,
    count: usize,
    #[serde(with = "crate::math::float_serde")]
    avg: f64,
}

impl AverageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.val = 0.0;
        self.sum = 0.0;
        self.count = 0;
        self.avg = 0.0;
    }

    /// Records `val` as observed `n` times.
    ///
    /// `val` is stored raw; `sum` grows by `val * n`.
    pub fn update(&mut self, val: f64, n: usize) {
        self.val = val;
        self.sum += val * n as f64;
        self.count += n;
        self.avg = if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        };
    }

    /// Same as `update(val, 1)`.
    pub fn update_one(&mut self, val: f64) {
        self.update(val, 1);
    }

    pub fn val(&self) -> f64 {
        self.val
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn avg(&self) -> f64 {
        self.avg
    }
}

impl fmt::Display for AverageMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} ({:.4})", self.val, self.avg)
    }
}
