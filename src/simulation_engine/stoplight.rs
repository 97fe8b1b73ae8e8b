//! Periodic two-phase traffic signals.
//!
//! A light cycles through one green and one red phase. Its phase is a pure
//! function of the elapsed time since its anchor (`time_last_update`, or the
//! simulation epoch if the light was never retimed), so it needs no per-tick
//! stepping.

/// Possible states of a stoplight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightState {
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopLight {
    /// Green phase duration in seconds.
    pub green_time: u64,
    /// Red phase duration in seconds.
    pub red_time: u64,
    /// Alignment anchor of the cycle. `None` means never retimed.
    pub time_last_update: Option<u64>,
    /// Timing waiting for the next cycle boundary, as `(green, red)`.
    pending: Option<(u64, u64)>,
    /// Polarity: `true` when the cycle starts with the green phase.
    pub initial_light: bool,
}

impl StopLight {
    /// Creates a green-first light anchored at the simulation epoch.
    pub fn new(green_time: u64, red_time: u64) -> Self {
        Self {
            green_time,
            red_time,
            time_last_update: None,
            pending: None,
            initial_light: true,
        }
    }

    /// Full cycle length in seconds.
    pub fn cycle(&self) -> u64 {
        self.green_time + self.red_time
    }

    /// Timing scheduled for the next cycle boundary, if any.
    pub fn pending(&self) -> Option<(u64, u64)> {
        self.pending
    }

    fn apply_pending(&mut self, time: u64) {
        if let (Some((green, red)), Some(boundary)) = (self.pending, self.time_last_update) {
            if time >= boundary {
                self.green_time = green;
                self.red_time = red;
                self.pending = None;
                log::trace!("stoplight switched to {}s green / {}s red at {}", green, red, boundary);
            }
        }
    }

    /// Schedules a new timing. It takes effect at the first boundary of the
    /// current cycle at or after `time`, so a phase in progress is never cut.
    pub fn update_times(&mut self, time: u64, green_time: u64, red_time: u64) {
        self.apply_pending(time);

        if self.pending.is_some() {
            // Boundary already fixed by the earlier request.
            self.pending = Some((green_time, red_time));
            return;
        }

        let anchor = self.time_last_update.unwrap_or(0);
        let cycle = self.cycle();
        let boundary = if cycle == 0 || time <= anchor {
            time.max(anchor)
        } else {
            anchor + (time - anchor).div_ceil(cycle) * cycle
        };

        self.pending = Some((green_time, red_time));
        self.time_last_update = Some(boundary);
    }

    /// State of the light at `time`. Applies a pending retime once its
    /// boundary has been reached.
    pub fn state(&mut self, time: u64) -> LightState {
        self.apply_pending(time);

        let cycle = self.cycle();
        if cycle == 0 {
            return LightState::Green;
        }

        let anchor = self.time_last_update.unwrap_or(0) as i128;
        let phase = (time as i128 - anchor).rem_euclid(cycle as i128) as u64;
        let green = if self.initial_light {
            phase < self.green_time
        } else {
            phase >= self.red_time
        };

        if green {
            LightState::Green
        } else {
            LightState::Red
        }
    }

    pub fn is_green(&mut self, time: u64) -> bool {
        self.state(time) == LightState::Green
    }

    /// Whether the green windows of `self` and `other` can never coincide
    /// when the two lights run opposite polarities from a shared anchor.
    ///
    /// The relative offset of the two windows only takes values on a lattice
    /// of step `gcd(T1, T2)`. A step larger than both greens together leaves
    /// no room for an overlap. Otherwise every window of `self` within one
    /// joint period `lcm(T1, T2)` is checked against the neighboring windows
    /// of `other`.
    pub fn is_compatible(&self, other: &StopLight) -> bool {
        let (g1, g2) = (self.green_time, other.green_time);
        if g1 == 0 || g2 == 0 {
            return true;
        }

        let t1 = self.cycle();
        let t2 = other.cycle();
        let r2 = other.red_time;

        let d = gcd(t1, t2);
        if d > g1 + g2 {
            return true;
        }

        // Green windows of `self` within one joint period.
        let windows = t2 / d;
        for k in 0..=windows {
            let start1 = (k * t1) as i128;
            let end1 = start1 + g1 as i128;

            let m = (start1 - r2 as i128).div_euclid(t2 as i128);
            for delta in -1..=1 {
                let current = m + delta;
                if current < 0 {
                    continue;
                }
                let start2 = current * t2 as i128 + r2 as i128;
                let end2 = start2 + g2 as i128;
                if start1 < end2 && start2 < end1 {
                    return false;
                }
            }
        }

        true
    }
}

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcm(a: u64, b: u64) -> u64 {
        a / gcd(a, b) * b
    }

    /// Tick-by-tick overlap check of a green-first and a red-first light.
    fn overlaps_brute_force(a: &StopLight, b: &StopLight) -> bool {
        let mut a = a.clone();
        let mut b = b.clone();
        a.initial_light = true;
        b.initial_light = false;
        let horizon = lcm(a.cycle().max(1), b.cycle().max(1));
        (0..horizon).any(|t| a.is_green(t) && b.is_green(t))
    }

    #[test]
    fn green_first_cycle() {
        let mut light = StopLight::new(10, 10);
        for t in 0..60 {
            assert_eq!(light.is_green(t), t % 20 < 10, "tick {}", t);
        }
    }

    #[test]
    fn red_first_cycle() {
        let mut light = StopLight::new(5, 15);
        light.initial_light = false;
        for t in 0..40 {
            assert_eq!(light.is_green(t), t % 20 >= 15, "tick {}", t);
        }
    }

    #[test]
    fn retime_waits_for_cycle_boundary() {
        let mut light = StopLight::new(10, 10);
        assert!(light.is_green(3));
        light.update_times(5, 5, 15);
        assert_eq!(light.time_last_update, Some(20));
        assert_eq!(light.pending(), Some((5, 15)));

        for t in 5..20 {
            assert_eq!(light.is_green(t), t < 10, "tick {}", t);
        }
        for t in 20..60 {
            assert_eq!(light.is_green(t), (t - 20) % 20 < 5, "tick {}", t);
        }
        assert_eq!(light.pending(), None);
        assert_eq!((light.green_time, light.red_time), (5, 15));
    }

    #[test]
    fn retime_on_boundary_applies_immediately() {
        let mut light = StopLight::new(10, 10);
        light.update_times(40, 3, 7);
        assert_eq!(light.time_last_update, Some(40));
        assert!(light.is_green(42));
        assert!(!light.is_green(43));
    }

    #[test]
    fn second_retime_keeps_first_boundary() {
        let mut light = StopLight::new(10, 10);
        light.update_times(5, 5, 15);
        light.update_times(12, 8, 12);
        assert_eq!(light.time_last_update, Some(20));
        assert!(light.is_green(27));
        assert!(!light.is_green(28));
    }

    #[test]
    fn always_green_without_red_phase() {
        let mut light = StopLight::new(30, 0);
        assert!((0..100).all(|t| light.is_green(t)));
        light.initial_light = false;
        assert!((0..100).all(|t| light.is_green(t)));
    }

    #[test]
    fn disjoint_halves_are_compatible() {
        let a = StopLight::new(10, 10);
        let b = StopLight::new(10, 10);
        assert!(a.is_compatible(&b));
        let greedy = StopLight::new(11, 9);
        assert!(!greedy.is_compatible(&b));
    }

    #[test]
    fn compatibility_is_symmetric_and_matches_brute_force() {
        let mut lights = Vec::new();
        for green in 0..=6 {
            for red in 0..=6 {
                if green + red > 0 {
                    lights.push(StopLight::new(green, red));
                }
            }
        }

        for a in &lights {
            for b in &lights {
                let fast = a.is_compatible(b);
                assert_eq!(fast, b.is_compatible(a), "{:?} vs {:?}", a, b);
                assert_eq!(fast, !overlaps_brute_force(a, b), "{:?} vs {:?}", a, b);
            }
        }
    }
}
