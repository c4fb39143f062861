use std::sync::Arc;

use pwmled_core::driver::WriteHandler;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

///How much of a line is kept and handed to a driver. The rest is read and counted but never looked at, the way a
/// driver only copies in a bounded prefix of a write.
const MAX_KEPT_LEN: usize = 4096;

///One open of the node. Every line read is one write; the reply is the write's return value on its own line.
///
/// Whatever part of a line the driver does not consume is dropped rather than offered again as another write.
pub(crate) async fn serve_connection(
    stream: UnixStream,
    handler: Arc<dyn WriteHandler>,
    cancel: CancellationToken,
) {
    handler.open();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let mut kept = Vec::new();
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = read_line_prefix(&mut reader, &mut kept) => read,
        };
        let line_len = match read {
            Ok(0) => break,
            Ok(line_len) => line_len,
            Err(err) => {
                warn!("error reading from node connection: {}", err);
                break;
            }
        };

        let ret = match write(&handler, kept, line_len).await {
            Some(ret) => ret,
            None => break,
        };
        if let Err(err) = write_half.write_all(format!("{}\n", ret).as_bytes()).await {
            warn!("error replying on node connection: {}", err);
            break;
        }
    }

    handler.release();
    debug!("node connection shutting down");
}

///Read up to and including the next newline (or to end of stream). At most `MAX_KEPT_LEN` bytes go into `kept`.
/// Returns the full length of the line.
async fn read_line_prefix<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    kept: &mut Vec<u8>,
) -> std::io::Result<usize> {
    let mut line_len = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(line_len);
        }
        let (chunk, done) = match available.iter().position(|b| *b == b'\n') {
            Some(newline) => (&available[..=newline], true),
            None => (available, false),
        };
        let room = MAX_KEPT_LEN.saturating_sub(kept.len());
        kept.extend_from_slice(&chunk[..chunk.len().min(room)]);
        let used = chunk.len();
        reader.consume(used);
        line_len += used;
        if done {
            return Ok(line_len);
        }
    }
}

//runs the handler off the async workers, since a pulse busy-waits for its whole duration
async fn write(handler: &Arc<dyn WriteHandler>, kept: Vec<u8>, line_len: usize) -> Option<i64> {
    let handler = handler.clone();
    let kept_len = kept.len();
    match tokio::task::spawn_blocking(move || handler.write(&kept)).await {
        //a driver that took everything it was shown took the whole line
        Ok(Ok(consumed)) if consumed == kept_len => Some(line_len as i64),
        Ok(Ok(consumed)) => Some(consumed as i64),
        Ok(Err(err)) => {
            warn!("write failed: {}", err);
            Some(i64::from(err.errno()))
        }
        Err(err) => {
            error!("write handler panicked: {}", err);
            None
        }
    }
}
