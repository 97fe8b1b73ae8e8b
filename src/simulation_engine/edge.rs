use crate::global_variables::{
    HOUR, MIN_SPEED_FACTOR, SPEED_A, SPEED_B, SPEED_C, SPEED_D, SPEED_E,
};

/// A directed road between two nodes.
///
/// Occupancy is counted flow: `cars` is real-valued and always lies in
/// `[0, capacity]`, where `capacity = length * width`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Speed limit in km/h.
    pub speed_limit: f64,
    /// Length of the road in meters.
    pub length: f64,
    /// Width of the road; together with length it bounds occupancy.
    pub width: f64,
    cars: f64,
}

impl Edge {
    /// Creates an empty road.
    pub fn new(speed_limit: f64, length: f64, width: f64) -> Self {
        Self {
            speed_limit,
            length,
            width,
            cars: 0.0,
        }
    }

    /// Maximum number of cars the road can hold.
    pub fn capacity(&self) -> f64 {
        self.length * self.width
    }

    /// Current occupancy.
    pub fn cars(&self) -> f64 {
        self.cars
    }

    /// Occupancy ratio in `[0, 1]`, the congestion signal used everywhere.
    pub fn workload(&self) -> f64 {
        let capacity = self.capacity();
        if capacity <= 0.0 {
            return 1.0;
        }
        self.cars / capacity
    }

    /// Sets the occupancy, clamped to `[0, capacity]`, and returns the value
    /// actually stored. Callers derive the accepted delta as
    /// `returned - previous`.
    pub fn update_cars(&mut self, new_cars: f64) -> f64 {
        self.cars = new_cars.clamp(0.0, self.capacity().max(0.0));
        self.cars
    }

    /// Admits `amount` cars only if all of them fit. A partially accepted
    /// update is rolled back and reported as a rejection.
    pub fn try_admit(&mut self, amount: f64) -> bool {
        let previous = self.cars;
        let accepted = self.update_cars(previous + amount) - previous;
        if accepted + f64::EPSILON < amount {
            self.update_cars(previous);
            return false;
        }
        true
    }

    /// Releases `amount` cars from the road and returns how many actually left.
    pub fn release(&mut self, amount: f64) -> f64 {
        let previous = self.cars;
        previous - self.update_cars(previous - amount)
    }

    /// Expected speed under the current workload, in km/h.
    pub fn avg_speed(&self) -> f64 {
        speed_factor(self.workload()) * self.speed_limit
    }

    /// Seconds needed to drive the road under the current workload.
    pub fn travel_time(&self) -> f64 {
        let speed = self.avg_speed();
        if speed <= 0.0 {
            return f64::INFINITY;
        }
        HOUR as f64 * (self.length / 1000.0) / speed
    }
}

/// Fraction of the speed limit reachable at the given workload.
pub fn speed_factor(workload: f64) -> f64 {
    let w = workload.clamp(0.0, 1.0);
    let factor = SPEED_A * w.powi(4) + SPEED_B * w.powi(3) + SPEED_C * w.powi(2) + SPEED_D * w
        + SPEED_E;
    factor.max(MIN_SPEED_FACTOR)
}
