//! Blink driver: a single letter picks the on-time of a slow period, so the LED visibly blinks.

use serde::Deserialize;
use tracing::{debug, warn};

use super::{ChannelSlot, WriteHandler};
use crate::{
    error::{PwmBuildError, WriteError},
    PwmChannel, PwmState,
};

///Highest accepted letter. `a` means off, each letter after it adds one `step_ns`.
const LAST_LETTER: u8 = b'j';

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    pub period_ns: u64,
    pub step_ns: u64,
    pub initial_on_ns: u64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            period_ns: 1_000_000_000,
            step_ns: 100_000_000,
            initial_on_ns: 500_000_000,
        }
    }
}

pub struct BlinkDriver<C> {
    name: String,
    cfg: BlinkConfig,
    slot: ChannelSlot<C>,
}

impl<C: PwmChannel> BlinkDriver<C> {
    pub fn attach(name: &str, cfg: &BlinkConfig, channel: C) -> Result<Self, PwmBuildError> {
        let longest = cfg.step_ns.saturating_mul(u64::from(LAST_LETTER - b'a'));
        if longest > cfg.period_ns || cfg.initial_on_ns > cfg.period_ns {
            return Err(PwmBuildError::from_string(format!(
                "blink on-times must fit in the {} ns period",
                cfg.period_ns
            )));
        }
        let mut initial = PwmState::enabled(cfg.period_ns);
        initial.duty_ns = cfg.initial_on_ns;
        let slot = ChannelSlot::attach(channel, &initial)?;
        Ok(Self {
            name: name.to_string(),
            cfg: cfg.clone(),
            slot,
        })
    }
}

impl<C: PwmChannel> WriteHandler for BlinkDriver<C> {
    fn name(&self) -> &str {
        &self.name
    }

    ///Only the first byte is looked at. A byte outside `a..=j` is logged and ignored but still consumed.
    fn write(&self, buf: &[u8]) -> Result<usize, WriteError> {
        let Some(&letter) = buf.first() else {
            return Ok(0);
        };
        if !(b'a'..=LAST_LETTER).contains(&letter) {
            warn!("{} - invalid value {:?}", self.name, letter as char);
            return Ok(1);
        }

        let mut state = PwmState::enabled(self.cfg.period_ns);
        state.duty_ns = self.cfg.step_ns * u64::from(letter - b'a');
        debug!("{} - on time {} ns", self.name, state.duty_ns);
        self.slot.with_channel(|channel| {
            channel
                .apply(&state)
                .map_err(|source| WriteError::HardwareApply { step: 0, source })
        })?;
        Ok(1)
    }

    fn detach(&self) {
        self.slot.detach();
    }
}
