use serde::Deserialize;

/// DistanceMode selects how race distance is derived for every racer of a deployment.
/// * `Positional` - forward delta of the racer's movement proxy, scaled by meters_per_unit
/// * `SpeedScaled` - current speed times rate_factor times the timestep (ground scroll proxy)
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMode {
    Positional { meters_per_unit: f64 },
    SpeedScaled { rate_factor: f64 },
}

impl Default for DistanceMode {
    fn default() -> Self {
        DistanceMode::Positional {
            meters_per_unit: 1.0,
        }
    }
}

/// RaceClock keeps the elapsed race time shared by all racers.
#[derive(Debug, Clone, Default)]
pub struct RaceClock {
    elapsed_s: f64,
    halted: bool,
}

impl RaceClock {
    pub fn new() -> RaceClock {
        RaceClock::default()
    }

    /// tick advances the clock and returns the timestep actually applied (0.0 when halted or
    /// for negative input).
    pub fn tick(&mut self, timestep_size: f64) -> f64 {
        if self.halted || !(timestep_size > 0.0) {
            return 0.0;
        }
        self.elapsed_s += timestep_size;
        timestep_size
    }

    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn reset(&mut self) {
        self.elapsed_s = 0.0;
        self.halted = false;
    }

    pub fn get_elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

/// Odometer accumulates forward-only distance for one racer in the configured mode.
#[derive(Debug, Clone)]
pub struct Odometer {
    mode: DistanceMode,
    distance: f64,
    last_x: f64,
}

impl Odometer {
    pub fn new(mode: DistanceMode, start_x: f64) -> Odometer {
        Odometer {
            mode,
            distance: 0.0,
            last_x: start_x,
        }
    }

    /// update consumes one movement sample. Positional mode reads x, speed scaled mode reads
    /// speed and timestep_size. Backward motion is never counted. Returns the distance added.
    pub fn update(&mut self, x: f64, speed: f64, timestep_size: f64) -> f64 {
        let delta = match self.mode {
            DistanceMode::Positional { meters_per_unit } => {
                let dx = x - self.last_x;
                self.last_x = x;
                dx * meters_per_unit
            }
            DistanceMode::SpeedScaled { rate_factor } => speed * rate_factor * timestep_size,
        };

        let delta = if delta > 0.0 { delta } else { 0.0 };
        self.distance += delta;
        delta
    }

    pub fn reset(&mut self, start_x: f64) {
        self.distance = 0.0;
        self.last_x = start_x;
    }

    pub fn get_distance(&self) -> f64 {
        self.distance
    }

    pub fn get_mode(&self) -> DistanceMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn clock_halts() {
        let mut clock = RaceClock::new();
        assert_abs_diff_eq!(clock.tick(0.1), 0.1);
        assert_abs_diff_eq!(clock.tick(-1.0), 0.0);
        clock.halt();
        assert_abs_diff_eq!(clock.tick(0.1), 0.0);
        assert_abs_diff_eq!(clock.get_elapsed_s(), 0.1);
        clock.reset();
        assert!(!clock.is_halted());
        assert_abs_diff_eq!(clock.get_elapsed_s(), 0.0);
    }

    #[test]
    fn positional_mode_ignores_backward_nudges() {
        let mut odo = Odometer::new(
            DistanceMode::Positional {
                meters_per_unit: 2.0,
            },
            10.0,
        );
        odo.update(11.0, 0.0, 0.1);
        odo.update(10.5, 0.0, 0.1);
        odo.update(12.0, 0.0, 0.1);
        // +1.0, ignored, +1.5 -> 2.5 units
        assert_abs_diff_eq!(odo.get_distance(), 5.0);
    }

    #[test]
    fn speed_scaled_mode_uses_rate_factor() {
        let mut odo = Odometer::new(DistanceMode::SpeedScaled { rate_factor: 0.8 }, 0.0);
        for _ in 0..10 {
            odo.update(0.0, 5.0, 0.1);
        }
        assert_abs_diff_eq!(odo.get_distance(), 4.0, epsilon = 1e-9);
        odo.update(0.0, -5.0, 0.1);
        assert_abs_diff_eq!(odo.get_distance(), 4.0, epsilon = 1e-9);
    }
}
