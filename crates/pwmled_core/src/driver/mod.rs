//! The write handlers behind a device node, one per LED driver, plus the slot that owns a driver's channel.

use std::sync::{Mutex, MutexGuard};

use tracing::{error, info};

use crate::{
    error::{PwmBuildError, WriteError},
    PwmChannel, PwmState,
};

pub mod blink;
pub mod dimmer;
pub mod pulse;

///What a device node calls into. Mirrors the open/write/release entry points of a character device.
pub trait WriteHandler: Send + Sync {
    ///Name used for the node and in logs.
    fn name(&self) -> &str;

    fn open(&self) {
        info!("{} - open was called!", self.name());
    }

    ///Handle one write. Returns how many bytes of `buf` were consumed.
    fn write(&self, buf: &[u8]) -> Result<usize, WriteError>;

    fn release(&self) {
        info!("{} - close was called!", self.name());
    }

    ///Disable and release the channel. Writes after this fail with `WriteError::NoDevice`.
    fn detach(&self);
}

///Owns a driver's channel behind a mutex. Holding the lock is holding the channel, so one write at a time
/// touches the hardware.
pub struct ChannelSlot<C> {
    inner: Mutex<Option<C>>,
}

impl<C: PwmChannel> ChannelSlot<C> {
    ///Configure and enable `channel` with `initial`. On failure the channel is dropped, which releases it.
    pub fn attach(mut channel: C, initial: &PwmState) -> Result<Self, PwmBuildError> {
        if let Err(err) = channel.apply(initial) {
            error!("could not enable pwm channel {}: {}", channel.label(), err);
            return Err(err.into());
        }
        info!(
            "pwm channel {} enabled: period {} ns, on time {} ns",
            channel.label(),
            initial.period_ns,
            initial.duty_ns
        );
        Ok(Self {
            inner: Mutex::new(Some(channel)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<C>> {
        //a writer that panicked mid-sweep leaves the channel in a valid state
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    ///Run `f` with exclusive access to the channel for its whole duration.
    pub fn with_channel<R>(
        &self,
        f: impl FnOnce(&mut C) -> Result<R, WriteError>,
    ) -> Result<R, WriteError> {
        let mut guard = self.lock();
        match guard.as_mut() {
            Some(channel) => f(channel),
            None => Err(WriteError::NoDevice),
        }
    }

    ///Disable the channel and drop it. Calling this twice is harmless.
    pub fn detach(&self) {
        let channel = self.lock().take();
        if let Some(mut channel) = channel {
            if let Err(err) = channel.disable() {
                error!("error disabling pwm channel {}: {}", channel.label(), err);
            }
            info!("pwm channel {} disabled and released", channel.label());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::PwmError, testing::RecordingChannel};

    #[test]
    fn test_attach_applies_initial_state() {
        let (channel, record) = RecordingChannel::new();
        let mut initial = PwmState::enabled(1_000);
        initial.duty_ns = 100;
        let _slot = ChannelSlot::attach(channel, &initial).unwrap();
        assert_eq!(record.lock().unwrap().applied, vec![initial]);
    }

    #[test]
    fn test_failed_attach_releases_channel() {
        let (channel, record) = RecordingChannel::failing_at(0);
        let res = ChannelSlot::attach(channel, &PwmState::enabled(1_000));
        assert!(res.is_err());
        assert!(record.lock().unwrap().released);
    }

    #[test]
    fn test_detach_then_write() {
        let (channel, record) = RecordingChannel::new();
        let slot = ChannelSlot::attach(channel, &PwmState::enabled(1_000)).unwrap();
        slot.detach();
        slot.detach();
        {
            let record = record.lock().unwrap();
            assert_eq!(record.disabled, 1);
            assert!(record.released);
        }
        let res: Result<(), WriteError> = slot.with_channel(|_| Ok(()));
        assert_eq!(res, Err(WriteError::NoDevice));
    }

    #[test]
    fn test_with_channel_passes_errors_through() {
        let (channel, _record) = RecordingChannel::new();
        let slot = ChannelSlot::attach(channel, &PwmState::enabled(1_000)).unwrap();
        let res: Result<(), WriteError> = slot.with_channel(|_| {
            Err(WriteError::HardwareApply {
                step: 0,
                source: PwmError::Hardware("nope".into()),
            })
        });
        assert_eq!(res.map_err(|e| e.errno()), Err(-5));
    }
}
