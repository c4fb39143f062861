use std::fmt::{Debug, Formatter};

use pwmled_core::error::{PwmBuildError, PwmError};

pub struct RpiPwmError {
    pub message: String,
}

impl Debug for RpiPwmError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        fmt.write_str(&self.message)
    }
}

impl From<String> for RpiPwmError {
    fn from(s: String) -> Self {
        Self { message: s }
    }
}

impl From<rppal::pwm::Error> for RpiPwmError {
    fn from(err: rppal::pwm::Error) -> Self {
        Self {
            message: format!("RpiPwmError - Cause: {}", err),
        }
    }
}

impl From<rppal::gpio::Error> for RpiPwmError {
    fn from(err: rppal::gpio::Error) -> Self {
        Self {
            message: format!("RpiGpioError - Cause: {}", err),
        }
    }
}

impl From<RpiPwmError> for PwmBuildError {
    fn from(err: RpiPwmError) -> Self {
        PwmBuildError::from_string(err.message)
    }
}

impl From<RpiPwmError> for PwmError {
    fn from(err: RpiPwmError) -> Self {
        PwmError::Hardware(err.message)
    }
}
