use std::time::Duration;

use pwmled_core::{error::PwmError, PwmChannel, PwmState};
use rppal::pwm::{Channel, Polarity, Pwm};
use tracing::debug;

use crate::error::RpiPwmError;

///One of the two hardware pwm outputs of the BCM283x, driven through sysfs.
pub struct HardwarePwm {
    pwm: Pwm,
    label: String,
    current: PwmState,
}

fn channel_from_index(index: u8) -> Result<Channel, RpiPwmError> {
    match index {
        0 => Ok(Channel::Pwm0),
        1 => Ok(Channel::Pwm1),
        other => Err(format!("no hardware pwm channel {}, expected 0 or 1", other).into()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SysfsWrite {
    Period(u64),
    Duty(u64),
    Enable,
    Disable,
}

///The sysfs writes that take `current` to `next`, skipping anything already in place. sysfs refuses a duty cycle
/// longer than the period, so when shrinking the period the duty has to go first.
fn plan_writes(current: &PwmState, next: &PwmState) -> Vec<SysfsWrite> {
    let mut writes = Vec::with_capacity(3);
    let period = (next.period_ns != current.period_ns).then_some(SysfsWrite::Period(next.period_ns));
    let duty = (next.duty_ns != current.duty_ns).then_some(SysfsWrite::Duty(next.duty_ns));
    if next.period_ns < current.period_ns {
        writes.extend(duty);
        writes.extend(period);
    } else {
        writes.extend(period);
        writes.extend(duty);
    }
    if next.enabled != current.enabled {
        writes.push(if next.enabled { SysfsWrite::Enable } else { SysfsWrite::Disable });
    }
    writes
}

impl HardwarePwm {
    ///Export and claim channel `index`. The channel starts disabled.
    pub fn request(index: u8, label: &str) -> Result<Self, RpiPwmError> {
        let channel = channel_from_index(index)?;
        let pwm = Pwm::new(channel)?;
        pwm.disable()?;
        if pwm.polarity()? != Polarity::Normal {
            pwm.set_polarity(Polarity::Normal)?;
        }
        //whatever a previous owner left behind
        let current = PwmState {
            period_ns: pwm.period()?.as_nanos() as u64,
            duty_ns: pwm.pulse_width()?.as_nanos() as u64,
            enabled: false,
        };
        debug!("requested hardware pwm channel {} as {}: {:?}", index, label, current);
        Ok(Self {
            pwm,
            label: label.to_string(),
            current,
        })
    }

    fn write_state(&mut self, state: &PwmState) -> Result<(), RpiPwmError> {
        for write in plan_writes(&self.current, state) {
            match write {
                SysfsWrite::Period(ns) => self.pwm.set_period(Duration::from_nanos(ns))?,
                SysfsWrite::Duty(ns) => self.pwm.set_pulse_width(Duration::from_nanos(ns))?,
                SysfsWrite::Enable => self.pwm.enable()?,
                SysfsWrite::Disable => self.pwm.disable()?,
            }
        }
        self.current = *state;
        Ok(())
    }
}

impl PwmChannel for HardwarePwm {
    fn apply(&mut self, state: &PwmState) -> Result<(), PwmError> {
        if self.current == *state {
            return Ok(());
        }
        self.write_state(state).map_err(PwmError::from)
    }

    fn disable(&mut self) -> Result<(), PwmError> {
        self.pwm
            .disable()
            .map_err(|err| PwmError::from(RpiPwmError::from(err)))?;
        self.current.enabled = false;
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}
