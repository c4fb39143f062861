//! Triangular duty-cycle ramp: the step count derived from a pulse duration and the numerator at each step.

///Per-write ramp derived from a pulse duration. Recomputed on every write, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampState {
    pub total_steps: u64,
}

impl RampState {
    pub fn new(duration_ms: u32, steps_per_ms: u32) -> Self {
        Self {
            total_steps: u64::from(duration_ms) * u64::from(steps_per_ms),
        }
    }

    ///Denominator shared by every step. Only meaningful when there is at least one step.
    pub fn scale(&self) -> u64 {
        self.total_steps.saturating_sub(1)
    }

    ///Numerator at step `i`: ramp up for the first half, then mirror back down.
    fn numerator(&self, i: u64) -> u64 {
        debug_assert!(i < self.total_steps);
        if i < self.total_steps / 2 {
            i
        } else {
            self.total_steps - 1 - i
        }
    }

    ///All numerators in sweep order, paired with their step index.
    pub fn steps(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        (0..self.total_steps).map(move |i| (i, self.numerator(i)))
    }
}
