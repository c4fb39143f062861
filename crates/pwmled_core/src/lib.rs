//!This is the core library for the pwmled project. It holds the pwm channel abstraction, the parsing and ramp
//! arithmetic, and the write handlers of the three LED drivers. Hardware access lives in `pwmled_rpi` and the
//! device node in `pwmled_node`.

use error::PwmError;

pub mod delay;
pub mod driver;
pub mod error;
pub mod parse;
pub mod ramp;

///Hardware facing state of a pwm channel. Timings are in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmState {
    pub period_ns: u64,
    pub duty_ns: u64,
    pub enabled: bool,
}

impl PwmState {
    ///An enabled state with the given period and no on-time yet.
    pub fn enabled(period_ns: u64) -> Self {
        Self {
            period_ns,
            duty_ns: 0,
            enabled: true,
        }
    }

    ///Set the duty cycle to `numerator / scale` of the period, rounded to the closest nanosecond.
    ///
    /// Fails when `scale` is zero or the ratio would exceed 100%.
    pub fn set_relative_duty_cycle(&mut self, numerator: u64, scale: u64) -> Result<(), PwmError> {
        if scale == 0 || numerator > scale {
            return Err(PwmError::InvalidDutyCycle { numerator, scale });
        }
        let product = u128::from(numerator) * u128::from(self.period_ns);
        let rounded = (product + u128::from(scale) / 2) / u128::from(scale);
        //numerator <= scale, so the result is at most period_ns
        self.duty_ns = rounded as u64;
        Ok(())
    }
}

///One addressable pwm output. A channel is owned by exactly one driver for its whole lifetime.
///
/// Dropping a channel releases it.
pub trait PwmChannel: Send {
    ///Program period, duty and the enable flag in one go.
    fn apply(&mut self, state: &PwmState) -> Result<(), PwmError>;

    fn disable(&mut self) -> Result<(), PwmError>;

    ///Human readable name used in logs.
    fn label(&self) -> &str;
}

impl<C: PwmChannel + ?Sized> PwmChannel for Box<C> {
    fn apply(&mut self, state: &PwmState) -> Result<(), PwmError> {
        (**self).apply(state)
    }

    fn disable(&mut self) -> Result<(), PwmError> {
        (**self).disable()
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

///A channel double that records every state it is handed. Shared with the tests of downstream crates through the
/// `testing` feature.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use crate::{error::PwmError, PwmChannel, PwmState};

    #[derive(Debug, Default)]
    pub struct Record {
        pub applied: Vec<PwmState>,
        pub disabled: usize,
        pub released: bool,
    }

    ///Records applied states into a shared `Record`. `fail_at` makes the n-th apply call (0 based) fail.
    pub struct RecordingChannel {
        pub record: Arc<Mutex<Record>>,
        pub fail_at: Option<usize>,
        calls: usize,
    }

    impl RecordingChannel {
        pub fn new() -> (Self, Arc<Mutex<Record>>) {
            let record = Arc::new(Mutex::new(Record::default()));
            (
                Self {
                    record: record.clone(),
                    fail_at: None,
                    calls: 0,
                },
                record,
            )
        }

        pub fn failing_at(step: usize) -> (Self, Arc<Mutex<Record>>) {
            let (mut channel, record) = Self::new();
            channel.fail_at = Some(step);
            (channel, record)
        }
    }

    impl PwmChannel for RecordingChannel {
        fn apply(&mut self, state: &PwmState) -> Result<(), PwmError> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_at == Some(call) {
                return Err(PwmError::Hardware(format!("injected failure at call {}", call)));
            }
            self.record.lock().unwrap().applied.push(*state);
            Ok(())
        }

        fn disable(&mut self) -> Result<(), PwmError> {
            self.record.lock().unwrap().disabled += 1;
            Ok(())
        }

        fn label(&self) -> &str {
            "recording"
        }
    }

    impl Drop for RecordingChannel {
        fn drop(&mut self) {
            if let Ok(mut record) = self.record.lock() {
                record.released = true;
            }
        }
    }
}
