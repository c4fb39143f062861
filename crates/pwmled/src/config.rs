use std::{future::Future, sync::Arc};

use pwmled_core::{
    driver::{
        blink::{BlinkConfig, BlinkDriver},
        dimmer::{DimmerConfig, DimmerDriver},
        pulse::{PulseConfig, PulseDriver},
        WriteHandler,
    },
    error::PwmBuildError,
    PwmChannel,
};
use pwmled_node::NodeConfig;
use pwmled_rpi::ChannelConfig;
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[derive(Deserialize, Debug, Default)]
pub struct MetadataConfig {
    pub name: Option<String>,
    pub description: Option<String>,
}

///Which LED driver sits behind the node.
#[derive(Deserialize, Debug)]
pub enum DriverConfig {
    //a write of N milliseconds pulses the LED up and down once
    Pulse(PulseConfig),
    //a letter a..j picks the on time of a one second period
    Blink(BlinkConfig),
    //a letter a..k picks the duty cycle in tenths
    Dimmer(DimmerConfig),
}

impl DriverConfig {
    fn default_name(&self) -> &'static str {
        match self {
            Self::Pulse(_) => "pulse_pwm_driver",
            Self::Blink(_) => "blink_pwm_driver",
            Self::Dimmer(_) => "dimmer_pwm_driver",
        }
    }

    pub fn build<C: PwmChannel + 'static>(
        &self,
        name: &str,
        channel: C,
    ) -> Result<Arc<dyn WriteHandler>, PwmBuildError> {
        let handler: Arc<dyn WriteHandler> = match self {
            Self::Pulse(cfg) => Arc::new(PulseDriver::attach(name, cfg, channel)?),
            Self::Blink(cfg) => Arc::new(BlinkDriver::attach(name, cfg, channel)?),
            Self::Dimmer(cfg) => Arc::new(DimmerDriver::attach(name, cfg, channel)?),
        };
        Ok(handler)
    }
}

#[derive(Deserialize, Debug)]
pub struct PwmLedConfig {
    #[serde(default)]
    pub metadata: MetadataConfig,
    pub node: NodeConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    pub driver: DriverConfig,
}

impl PwmLedConfig {
    pub fn driver_name(&self) -> &str {
        self.metadata
            .name
            .as_deref()
            .unwrap_or_else(|| self.driver.default_name())
    }

    ///Attach the driver, serve the node until SIGINT or SIGTERM, then detach.
    pub async fn start(self) -> Result<(), PwmBuildError> {
        //installed before attaching, so failing here leaves nothing to unwind
        let shutdown = shutdown_signal()?;
        let name = self.driver_name().to_string();
        self.serve_until(|| Ok(pwmled_rpi::acquire(&self.channel, &name)?), shutdown)
            .await
    }

    ///Attach with the channel from `acquire`, serve until `shutdown` completes, then detach.
    pub async fn serve_until<C, F, S>(&self, acquire: F, shutdown: S) -> Result<(), PwmBuildError>
    where
        C: PwmChannel + 'static,
        F: FnOnce() -> Result<C, PwmBuildError>,
        S: Future<Output = ()>,
    {
        let name = self.driver_name();
        let attachment = pwmled_node::attach(&self.node, || {
            let channel = acquire()?;
            self.driver.build(name, channel)
        })?;

        shutdown.await;

        attachment.detach().await;
        Ok(())
    }
}

fn shutdown_signal() -> Result<impl Future<Output = ()>, PwmBuildError> {
    let mut terminate = signal(SignalKind::terminate()).map_err(|err| {
        PwmBuildError::from_string(format!("could not listen for SIGTERM: {}", err))
    })?;
    Ok(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("got SIGINT"),
            _ = terminate.recv() => info!("got SIGTERM"),
        }
    })
}
