//! Pulse driver: a write of `N` milliseconds sweeps the LED up and back down once, synchronously.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, warn};

use super::{ChannelSlot, WriteHandler};
use crate::{
    delay::spin_delay,
    error::{PwmBuildError, WriteError},
    parse::parse_u32,
    ramp::RampState,
    PwmChannel, PwmState,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub period_ns: u64,
    pub steps_per_ms: u32,
    pub step_delay_us: u64,
    //writes asking for longer pulses are refused before the hardware is touched
    pub max_duration_ms: u32,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            period_ns: 1_000_000,
            steps_per_ms: 100,
            step_delay_us: 10,
            max_duration_ms: 60_000,
        }
    }
}

pub struct PulseDriver<C> {
    name: String,
    cfg: PulseConfig,
    step_delay: Duration,
    slot: ChannelSlot<C>,
}

impl<C: PwmChannel> PulseDriver<C> {
    ///Enable `channel` at a tenth of the period and take ownership of it.
    pub fn attach(name: &str, cfg: &PulseConfig, channel: C) -> Result<Self, PwmBuildError> {
        if cfg.period_ns == 0 || cfg.steps_per_ms == 0 {
            return Err(PwmBuildError::message(
                "pulse driver needs a non zero period and steps per millisecond",
            ));
        }
        let mut initial = PwmState::enabled(cfg.period_ns);
        initial.duty_ns = cfg.period_ns / 10;
        let slot = ChannelSlot::attach(channel, &initial)?;
        Ok(Self {
            name: name.to_string(),
            cfg: cfg.clone(),
            step_delay: Duration::from_micros(cfg.step_delay_us),
            slot,
        })
    }

    ///Parse a duration out of `buf` and run the ramp. The channel stays locked for the whole sweep.
    pub fn pulse(&self, buf: &[u8]) -> Result<usize, WriteError> {
        let duration_ms = parse_u32(buf).map_err(|err| {
            warn!("{} - invalid value: {}", self.name, err);
            WriteError::from(err)
        })?;
        debug!("{} - value is {}, count is {}", self.name, duration_ms, buf.len());

        if duration_ms > self.cfg.max_duration_ms {
            warn!(
                "{} - refusing {} ms pulse, limit is {} ms",
                self.name, duration_ms, self.cfg.max_duration_ms
            );
            return Err(WriteError::DurationTooLong {
                requested_ms: duration_ms,
                limit_ms: self.cfg.max_duration_ms,
            });
        }

        let ramp = RampState::new(duration_ms, self.cfg.steps_per_ms);
        self.slot
            .with_channel(|channel| sweep(channel, &ramp, self.cfg.period_ns, self.step_delay))?;
        Ok(buf.len())
    }
}

///Apply every step of `ramp` in order, spinning `step_delay` after each one. Stops at the first failure; steps
/// already applied stay applied.
pub fn sweep<C: PwmChannel>(
    channel: &mut C,
    ramp: &RampState,
    period_ns: u64,
    step_delay: Duration,
) -> Result<(), WriteError> {
    for (step, numerator) in ramp.steps() {
        let mut state = PwmState::enabled(period_ns);
        let applied = state
            .set_relative_duty_cycle(numerator, ramp.scale())
            .and_then(|_| channel.apply(&state));
        if let Err(source) = applied {
            error!(
                "error applying duty cycle {}/{} on {}: {}",
                numerator,
                ramp.scale(),
                channel.label(),
                source
            );
            return Err(WriteError::HardwareApply { step, source });
        }
        spin_delay(step_delay);
    }
    Ok(())
}

impl<C: PwmChannel> WriteHandler for PulseDriver<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, buf: &[u8]) -> Result<usize, WriteError> {
        self.pulse(buf)
    }

    fn detach(&self) {
        self.slot.detach();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::{
        error::{ParseError, PwmError},
        testing::RecordingChannel,
    };

    fn fast_config() -> PulseConfig {
        PulseConfig {
            step_delay_us: 0,
            ..PulseConfig::default()
        }
    }

    //applied states minus the one written at attach time
    fn sweep_states(record: &std::sync::Mutex<crate::testing::Record>) -> Vec<PwmState> {
        record.lock().unwrap().applied[1..].to_vec()
    }

    #[test]
    fn test_attach_enables_at_tenth() {
        let (channel, record) = RecordingChannel::new();
        let _driver = PulseDriver::attach("pulse", &PulseConfig::default(), channel).unwrap();
        let applied = record.lock().unwrap().applied.clone();
        assert_eq!(
            applied,
            vec![PwmState {
                period_ns: 1_000_000,
                duty_ns: 100_000,
                enabled: true
            }]
        );
    }

    #[test]
    fn test_ten_ms_pulse() {
        let (channel, record) = RecordingChannel::new();
        let driver = PulseDriver::attach("pulse", &PulseConfig::default(), channel).unwrap();
        assert_eq!(driver.pulse(b"10"), Ok(2));

        let states = sweep_states(&record);
        assert_eq!(states.len(), 1000);
        assert!(states.iter().all(|s| s.enabled && s.period_ns == 1_000_000));

        let expected: Vec<u64> = (0..500u64).chain((0..500u64).rev()).collect();
        let mut reference = PwmState::enabled(1_000_000);
        let expected_duty: Vec<u64> = expected
            .iter()
            .map(|n| {
                reference.set_relative_duty_cycle(*n, 999).unwrap();
                reference.duty_ns
            })
            .collect();
        let duty: Vec<u64> = states.iter().map(|s| s.duty_ns).collect();
        assert_eq!(duty, expected_duty);
        assert_eq!(duty[499], duty[500]);
    }

    #[test]
    fn test_newline_counts_as_consumed() {
        let (channel, record) = RecordingChannel::new();
        let driver = PulseDriver::attach("pulse", &fast_config(), channel).unwrap();
        assert_eq!(driver.pulse(b"1\n"), Ok(2));
        assert_eq!(sweep_states(&record).len(), 100);
    }

    #[test]
    fn test_zero_duration() {
        let (channel, record) = RecordingChannel::new();
        let driver = PulseDriver::attach("pulse", &fast_config(), channel).unwrap();
        assert_eq!(driver.pulse(b"0"), Ok(1));
        assert!(sweep_states(&record).is_empty());
    }

    #[test]
    fn test_parse_errors_touch_nothing() {
        let (channel, record) = RecordingChannel::new();
        let driver = PulseDriver::attach("pulse", &fast_config(), channel).unwrap();
        assert_eq!(driver.pulse(b"abc"), Err(WriteError::Parse(ParseError::Invalid)));
        assert_eq!(
            driver.pulse(b"4294967296"),
            Err(WriteError::Parse(ParseError::OutOfRange))
        );
        assert!(sweep_states(&record).is_empty());
    }

    #[test]
    fn test_duration_limit() {
        let (channel, record) = RecordingChannel::new();
        let cfg = PulseConfig {
            max_duration_ms: 5,
            ..fast_config()
        };
        let driver = PulseDriver::attach("pulse", &cfg, channel).unwrap();
        assert_eq!(
            driver.pulse(b"6"),
            Err(WriteError::DurationTooLong {
                requested_ms: 6,
                limit_ms: 5
            })
        );
        assert!(sweep_states(&record).is_empty());
        assert_eq!(driver.pulse(b"5"), Ok(1));
    }

    #[test]
    fn test_failure_at_step_k_aborts() {
        //call 0 is the attach, so the sweep's step k is call k + 1
        let k = 37;
        let (channel, record) = RecordingChannel::failing_at(k + 1);
        let driver = PulseDriver::attach("pulse", &fast_config(), channel).unwrap();
        let res = driver.pulse(b"1");
        assert_eq!(
            res,
            Err(WriteError::HardwareApply {
                step: k as u64,
                source: PwmError::Hardware(format!("injected failure at call {}", k + 1)),
            })
        );
        assert_eq!(sweep_states(&record).len(), k);

        //the failure does not stick: the next write runs a full sweep
        assert_eq!(driver.pulse(b"1"), Ok(1));
        assert_eq!(sweep_states(&record).len(), k + 100);
    }

    #[test]
    fn test_invalid_scale_is_an_apply_error() {
        let (mut channel, record) = RecordingChannel::new();
        //a single step has scale 0, which no duty cycle satisfies
        let ramp = RampState { total_steps: 1 };
        let res = sweep(&mut channel, &ramp, 1_000, Duration::ZERO);
        assert_eq!(
            res,
            Err(WriteError::HardwareApply {
                step: 0,
                source: PwmError::InvalidDutyCycle { numerator: 0, scale: 0 },
            })
        );
        assert!(record.lock().unwrap().applied.is_empty());
    }

    #[test]
    fn test_concurrent_pulses_do_not_interleave() {
        let (channel, record) = RecordingChannel::new();
        let driver = Arc::new(PulseDriver::attach("pulse", &fast_config(), channel).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let driver = driver.clone();
                thread::spawn(move || driver.pulse(b"2"))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(1));
        }

        let states = sweep_states(&record);
        assert_eq!(states.len(), 800);
        let mut reference = PwmState::enabled(1_000_000);
        let one_sweep: Vec<u64> = RampState::new(2, 100)
            .steps()
            .map(|(_, n)| {
                reference.set_relative_duty_cycle(n, 199).unwrap();
                reference.duty_ns
            })
            .collect();
        for chunk in states.chunks(200) {
            let duty: Vec<u64> = chunk.iter().map(|s| s.duty_ns).collect();
            assert_eq!(duty, one_sweep);
        }
    }

    #[test]
    fn test_detach_disables_and_refuses_writes() {
        let (channel, record) = RecordingChannel::new();
        let driver = PulseDriver::attach("pulse", &fast_config(), channel).unwrap();
        driver.detach();
        assert_eq!(driver.pulse(b"1"), Err(WriteError::NoDevice));
        let record = record.lock().unwrap();
        assert_eq!(record.disabled, 1);
        assert!(record.released);
    }

    #[test]
    fn test_rejects_zero_period() {
        let (channel, _record) = RecordingChannel::new();
        let cfg = PulseConfig {
            period_ns: 0,
            ..PulseConfig::default()
        };
        assert!(PulseDriver::attach("pulse", &cfg, channel).is_err());
    }
}
