//! Time-windowed parameter interpolation, used by actions that evolve an engine
//! parameter over simulation blocks.

use serde::{Deserialize, Serialize};

/// Interpolation shape inside the window. Linear is the contractual default;
/// the power exponent is an opt-in, per-schedule choice.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    Power(f64),
}

impl Easing {
    fn apply(&self, frac: f64) -> f64 {
        match self {
            Easing::Linear => frac,
            Easing::Power(p) => frac.powf(*p),
        }
    }
}

/// A window `[start_block, end_block]` with boundary values: before the window
/// the value is `from`, after it `to`, inside it the eased interpolation.
/// Created once at expansion time and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Schedule {
    pub start_block: usize,
    pub end_block: usize,
    pub from: f64,
    pub to: f64,
    #[serde(default)]
    pub easing: Easing,
}

impl Schedule {
    pub fn linear(start_block: usize, end_block: usize, from: f64, to: f64) -> Self {
        Self {
            start_block,
            end_block,
            from,
            to,
            easing: Easing::Linear,
        }
    }

    pub fn value_at(&self, block: usize) -> f64 {
        if block < self.start_block {
            return self.from;
        }
        if block >= self.end_block {
            return self.to;
        }
        let frac =
            (block - self.start_block) as f64 / (self.end_block - self.start_block) as f64;
        self.from + (self.to - self.from) * self.easing.apply(frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn values_clamp_outside_the_window() {
        let schedule = Schedule::linear(100, 200, 10.0, 50.0);
        assert_eq!(schedule.value_at(50), 10.0);
        assert_eq!(schedule.value_at(250), 50.0);
    }

    #[test]
    fn linear_interpolation_at_the_midpoint() {
        let schedule = Schedule::linear(100, 200, 10.0, 50.0);
        assert!((schedule.value_at(150) - 30.0).abs() < TOLERANCE);
    }

    #[test]
    fn window_boundaries_take_the_boundary_values() {
        let schedule = Schedule::linear(100, 200, 10.0, 50.0);
        assert_eq!(schedule.value_at(100), 10.0);
        assert_eq!(schedule.value_at(200), 50.0);
    }

    #[test]
    fn decreasing_schedules_interpolate_downward() {
        let schedule = Schedule::linear(0, 10, 8.0, 4.0);
        assert!((schedule.value_at(5) - 6.0).abs() < TOLERANCE);
    }

    #[test]
    fn power_easing_bends_the_curve() {
        let schedule = Schedule {
            start_block: 0,
            end_block: 100,
            from: 0.0,
            to: 1.0,
            easing: Easing::Power(0.25),
        };
        // frac = 1/2 -> (1/2)^(1/4)
        assert!((schedule.value_at(50) - 0.5f64.powf(0.25)).abs() < TOLERANCE);
    }

    #[test]
    fn empty_window_degenerates_to_a_step() {
        let schedule = Schedule::linear(10, 10, 1.0, 2.0);
        assert_eq!(schedule.value_at(9), 1.0);
        assert_eq!(schedule.value_at(10), 2.0);
    }
}
