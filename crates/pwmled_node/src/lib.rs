//!The device node of a pwmled driver: a unix socket that user space writes to, standing in for a character device.
//!
//! Opening the node is connecting to the socket, and every newline terminated line sent is one write. The reply to
//! each write is a line holding its return value: the number of bytes consumed, or a negative errno.
//!
//! `attach` acquires the node and then the driver, unwinding in reverse order if the driver can't be built.
//! `Attachment::detach` releases the channel first and the node last.

pub(crate) mod connection;
pub mod node;

use std::{path::PathBuf, sync::Arc};

use pwmled_core::{driver::WriteHandler, error::PwmBuildError};
use serde::Deserialize;
use tracing::{error, info};

use node::{DeviceNode, NodeReservation};

#[derive(Debug, Deserialize)]
pub struct NodeConfig {
    pub path: PathBuf,
}

///A driver wired to its node. Dropping this without calling `detach` still unlinks the node, but leaves the channel
/// to be released whenever the last connection lets go of the driver.
pub struct Attachment {
    handler: Arc<dyn WriteHandler>,
    node: DeviceNode,
}

///Create the node, then build the driver with `build`. If `build` fails the node is removed again before returning.
pub fn attach<F>(cfg: &NodeConfig, build: F) -> Result<Attachment, PwmBuildError>
where
    F: FnOnce() -> Result<Arc<dyn WriteHandler>, PwmBuildError>,
{
    let reservation = NodeReservation::bind(&cfg.path)?;
    let handler = match build() {
        Ok(handler) => handler,
        Err(err) => {
            error!("driver could not be attached, removing node: {:?}", err);
            return Err(err);
        }
    };
    let node = reservation.serve(handler.clone());
    info!("{} attached at {}", handler.name(), node.path().display());
    Ok(Attachment { handler, node })
}

impl Attachment {
    ///Disable and release the channel, then stop serving and remove the node.
    pub async fn detach(self) {
        let handler = self.handler.clone();
        //waits for an in-flight pulse to finish, so keep it off the async workers
        if let Err(err) = tokio::task::spawn_blocking(move || handler.detach()).await {
            error!("error detaching driver: {}", err);
        }
        self.node.shutdown().await;
        info!("{} detached", self.handler.name());
    }
}
