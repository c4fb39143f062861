use std::time::Duration;

use pwmled_core::{error::PwmError, PwmChannel, PwmState};
use rppal::gpio::{Gpio, OutputPin};
use tracing::debug;

use crate::error::RpiPwmError;

///Software pwm on a plain gpio pin. Timing is done by a background thread inside rppal and can be noisy, so this is
/// for boards where the hardware channels are already taken.
pub struct SoftPwm {
    pin: OutputPin,
    label: String,
}

impl SoftPwm {
    pub fn request(pin: u8, label: &str) -> Result<Self, RpiPwmError> {
        let gpio = Gpio::new()?;
        let mut pin = gpio.get(pin)?.into_output();
        pin.set_low();
        debug!("requested gpio {} for soft pwm as {}", pin.pin(), label);
        Ok(Self {
            pin,
            label: label.to_string(),
        })
    }
}

impl PwmChannel for SoftPwm {
    fn apply(&mut self, state: &PwmState) -> Result<(), PwmError> {
        if !state.enabled {
            return self.disable();
        }
        self.pin
            .set_pwm(
                Duration::from_nanos(state.period_ns),
                Duration::from_nanos(state.duty_ns),
            )
            .map_err(|err| RpiPwmError::from(err).into())
    }

    fn disable(&mut self) -> Result<(), PwmError> {
        self.pin.clear_pwm().map_err(|err| PwmError::from(RpiPwmError::from(err)))?;
        self.pin.set_low();
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}
