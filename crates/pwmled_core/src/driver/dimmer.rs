//! Dimmer driver: a single letter picks a duty cycle in tenths of a fast period.

use serde::Deserialize;
use tracing::{debug, warn};

use super::{ChannelSlot, WriteHandler};
use crate::{
    error::{PwmBuildError, WriteError},
    PwmChannel, PwmState,
};

const LEVELS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DimmerConfig {
    pub period_ns: u64,
}

impl Default for DimmerConfig {
    fn default() -> Self {
        Self {
            period_ns: 1_000_000,
        }
    }
}

pub struct DimmerDriver<C> {
    name: String,
    cfg: DimmerConfig,
    slot: ChannelSlot<C>,
}

impl<C: PwmChannel> DimmerDriver<C> {
    pub fn attach(name: &str, cfg: &DimmerConfig, channel: C) -> Result<Self, PwmBuildError> {
        let mut initial = PwmState::enabled(cfg.period_ns);
        initial.duty_ns = cfg.period_ns / LEVELS;
        let slot = ChannelSlot::attach(channel, &initial)?;
        Ok(Self {
            name: name.to_string(),
            cfg: cfg.clone(),
            slot,
        })
    }
}

impl<C: PwmChannel> WriteHandler for DimmerDriver<C> {
    fn name(&self) -> &str {
        &self.name
    }

    ///`a` is off, `k` is fully on. Anything else is logged, ignored and consumed.
    fn write(&self, buf: &[u8]) -> Result<usize, WriteError> {
        let Some(&letter) = buf.first() else {
            return Ok(0);
        };
        let level = u64::from(letter.wrapping_sub(b'a'));
        if level > LEVELS {
            warn!("{} - invalid value {:?}", self.name, letter as char);
            return Ok(1);
        }

        let mut state = PwmState::enabled(self.cfg.period_ns);
        self.slot.with_channel(|channel| {
            state
                .set_relative_duty_cycle(level, LEVELS)
                .and_then(|_| channel.apply(&state))
                .map_err(|source| WriteError::HardwareApply { step: 0, source })
        })?;
        debug!("{} - duty cycle {}/{}", self.name, level, LEVELS);
        Ok(1)
    }

    fn detach(&self) {
        self.slot.detach();
    }
}
