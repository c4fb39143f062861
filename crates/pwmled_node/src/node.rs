use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use futures_util::future::join_all;
use pwmled_core::{driver::WriteHandler, error::PwmBuildError};
use tokio::{net::UnixListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::connection::serve_connection;

///The socket file on disk. Removing it is the last step of a detach, or of a failed attach.
struct NodeFile {
    path: PathBuf,
}

impl Drop for NodeFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("node {} removed", self.path.display()),
            Err(err) => error!("could not remove node {}: {}", self.path.display(), err),
        }
    }
}

///A bound but not yet served node. Dropping it unlinks the socket.
pub struct NodeReservation {
    listener: UnixListener,
    file: NodeFile,
}

impl NodeReservation {
    ///Create the socket file at `path`. Must be called from within a tokio runtime.
    pub fn bind(path: &Path) -> Result<Self, PwmBuildError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                PwmBuildError::from_string(format!(
                    "could not create directory for node {}: {}",
                    path.display(),
                    err
                ))
            })?;
        }
        let listener = UnixListener::bind(path).map_err(|err| {
            PwmBuildError::from_string(format!("could not create node {}: {}", path.display(), err))
        })?;
        info!("node {} created", path.display());
        Ok(Self {
            listener,
            file: NodeFile {
                path: path.to_path_buf(),
            },
        })
    }

    ///Start accepting opens of the node, handing every write to `handler`.
    pub fn serve(self, handler: Arc<dyn WriteHandler>) -> DeviceNode {
        let cancel = CancellationToken::new();
        let join_handle = spawn_accept_task(self.listener, handler, cancel.clone());
        DeviceNode {
            cancel,
            join_handle,
            file: self.file,
        }
    }
}

fn spawn_accept_task(
    listener: UnixListener,
    handler: Arc<dyn WriteHandler>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut connections = Vec::new();
        let mut next_id: u64 = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let span = info_span!("connection", id = next_id);
                        next_id += 1;
                        connections.push(tokio::spawn(
                            serve_connection(stream, handler.clone(), cancel.child_token()).instrument(span),
                        ));
                    }
                    Err(err) => error!("error accepting on node: {}", err),
                }
            }
            connections.retain(|connection: &JoinHandle<()>| !connection.is_finished());
        }
        join_all(connections).await;
        debug!("node accept task shutting down");
    })
}

///A node being served.
pub struct DeviceNode {
    cancel: CancellationToken,
    join_handle: JoinHandle<()>,
    file: NodeFile,
}

impl DeviceNode {
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    ///Close every open connection, wait for in-flight writes, then unlink the socket.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.join_handle.await {
            error!("node accept task failed: {}", err);
        }
        drop(self.file);
    }
}
