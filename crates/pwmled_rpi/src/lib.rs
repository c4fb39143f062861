//!This library provides pwm channels on the Raspberry Pi. It is a wrapper around the rppal library.
//!
//! `acquire` turns a `ChannelConfig` into a boxed `PwmChannel` that the drivers in `pwmled_core` can own.

//internal error type for rpi pwm
pub mod error;

//the two sysfs backed hardware pwm outputs
pub mod hardware;

//software pwm on any gpio pin
pub mod soft;

use pwmled_core::PwmChannel;
use serde::Deserialize;

use crate::{error::RpiPwmError, hardware::HardwarePwm, soft::SoftPwm};

#[derive(Debug, Deserialize)]
pub enum ChannelConfig {
    //Hardware pwm channel 0 or 1. Which gpio it appears on depends on the device tree overlay.
    Hardware { channel: u8 },
    //Software pwm on the given gpio pin (BCM numbering).
    Soft { pin: u8 },
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig::Hardware { channel: 0 }
    }
}

//claim the configured channel. It is released when the returned box is dropped.
pub fn acquire(cfg: &ChannelConfig, label: &str) -> Result<Box<dyn PwmChannel>, RpiPwmError> {
    match cfg {
        ChannelConfig::Hardware { channel } => Ok(Box::new(HardwarePwm::request(*channel, label)?)),
        ChannelConfig::Soft { pin } => Ok(Box::new(SoftPwm::request(*pin, label)?)),
    }
}
