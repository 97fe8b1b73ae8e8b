// Time units (seconds)
pub const MINUTE: u64 = 60;
pub const HOUR: u64 = 3600;
pub const DAY: u64 = 24 * HOUR;
pub const HOURS_PER_DAY: usize = 24;

// Departure curves: normal densities over the hour of day.
pub const SIGMA: f64 = 1.8;
pub const CITIZENS_MU: f64 = 8.0;
pub const GUESTS_MU: f64 = 18.0;

// Quartic fit of the speed factor over road workload.
pub const SPEED_A: f64 = -1.04772;
pub const SPEED_B: f64 = -0.70369;
pub const SPEED_C: f64 = 1.09484;
pub const SPEED_D: f64 = -0.360749;
pub const SPEED_E: f64 = 1.01732;

/// The polynomial reaches zero at full workload; keep roads passable.
pub const MIN_SPEED_FACTOR: f64 = 0.05;

/// Accepted relative deviation of a retimed red phase from its target.
pub const OPTIMIZER_TOLERANCE: f64 = 0.15;
