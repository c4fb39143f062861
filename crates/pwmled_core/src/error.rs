//!A mod for the error types
use std::fmt::Debug;

use thiserror::Error;

///Common error type when attaching a driver. Anything that fails before the driver is operable ends up here.
pub enum PwmBuildError {
    Message(String),
}

impl PwmBuildError {
    pub fn from_string(msg: String) -> Self {
        PwmBuildError::Message(msg)
    }
    pub fn message(msg: &str) -> Self {
        PwmBuildError::Message(msg.to_string())
    }
}

impl Debug for PwmBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => f.write_fmt(format_args!("PwmBuildError: {}", message)),
        }
    }
}

impl From<PwmError> for PwmBuildError {
    fn from(err: PwmError) -> Self {
        PwmBuildError::from_string(format!("could not configure pwm channel: {}", err))
    }
}

///Failure to turn a write buffer into an unsigned 32 bit value.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("not an unsigned decimal integer")]
    Invalid,
    #[error("value does not fit in 32 bits")]
    OutOfRange,
}

///Rejections coming from a pwm channel or from building the state handed to it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PwmError {
    #[error("relative duty cycle {numerator}/{scale} is not within 0..=1")]
    InvalidDutyCycle { numerator: u64, scale: u64 },
    #[error("hardware rejected state: {0}")]
    Hardware(String),
}

///Everything a write can fail with. The node reports these to the writer as a negative errno.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("invalid value: {0}")]
    Parse(#[from] ParseError),
    #[error("pulse of {requested_ms} ms exceeds the limit of {limit_ms} ms")]
    DurationTooLong { requested_ms: u32, limit_ms: u32 },
    #[error("applying duty cycle failed at step {step}: {source}")]
    HardwareApply { step: u64, source: PwmError },
    #[error("pwm channel has been released")]
    NoDevice,
}

const EIO: i32 = 5;
const E2BIG: i32 = 7;
const ENODEV: i32 = 19;
const EINVAL: i32 = 22;
const ERANGE: i32 = 34;

impl WriteError {
    ///Negative errno, the way a failed write(2) would surface it.
    pub fn errno(&self) -> i32 {
        match self {
            Self::Parse(ParseError::Invalid) => -EINVAL,
            Self::Parse(ParseError::OutOfRange) => -ERANGE,
            Self::DurationTooLong { .. } => -E2BIG,
            Self::HardwareApply { .. } => -EIO,
            Self::NoDevice => -ENODEV,
        }
    }
}
