//! Time-of-day departure rates and their conversion to whole cars.

use std::f64::consts::PI;

use crate::global_variables::{CITIZENS_MU, DAY, GUESTS_MU, HOUR, SIGMA};

/// Which population a departure curve describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandCurve {
    /// Residents leaving home, peaking in the morning.
    Citizens,
    /// Visitors heading back home, peaking in the evening.
    Guests,
}

impl DemandCurve {
    pub fn mean_hour(self) -> f64 {
        match self {
            DemandCurve::Citizens => CITIZENS_MU,
            DemandCurve::Guests => GUESTS_MU,
        }
    }

    /// Probability mass of departures in the `delta` seconds following
    /// `time` (seconds, reduced to the time of day).
    pub fn leaving_factor(self, time: u64, delta: u64) -> f64 {
        let hours = (time % DAY) as f64 / HOUR as f64;
        let dx = delta as f64 / HOUR as f64;
        normal_pdf(hours, self.mean_hour(), SIGMA) * dx
    }
}

pub fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    (-0.5 * z * z).exp() / (sigma * (2.0 * PI).sqrt())
}

/// Carries the fractional remainder of expected departures between ticks so
/// the emitted integer counts track the continuous rate without drift.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DemandAccumulator {
    carry: f64,
}

impl DemandAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `expected` cars and returns how many whole cars to emit now.
    pub fn accumulate(&mut self, expected: f64) -> u64 {
        self.accumulate_capped(expected, u64::MAX)
    }

    /// Like `accumulate`, but emits at most `limit` cars. Whole cars held
    /// back by the limit stay in the carry for later ticks.
    pub fn accumulate_capped(&mut self, expected: f64, limit: u64) -> u64 {
        if expected.is_finite() && expected > 0.0 {
            self.carry += expected;
        }
        let emitted = (self.carry.floor() as u64).min(limit);
        self.carry -= emitted as f64;
        emitted
    }

    pub fn carry(&self) -> f64 {
        self.carry
    }
}
