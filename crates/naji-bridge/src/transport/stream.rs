//! Newline-delimited JSON over a byte stream.
//!
//! Lets a guest run as a child process (or over a socket) with the host on
//! the other end of the pipe: one JSON document per line in each direction.

use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use super::{InboundHandler, Transport};
use crate::error::TransportError;
use crate::frame::OutboundFrame;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin + 'static>;

/// Transport over any tokio reader/writer pair
pub struct StreamTransport {
    outbound: mpsc::UnboundedSender<String>,
    /// Taken by the first `listen`
    reader: Mutex<Option<BoxedReader>>,
}

impl StreamTransport {
    /// Wrap a reader/writer pair. Spawns the writer task, so this must be
    /// called from within a tokio runtime.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (outbound, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(writer, rx));

        Self {
            outbound,
            reader: Mutex::new(Some(Box::new(reader))),
        }
    }

    /// Talk to the host over this process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Transport for StreamTransport {
    fn listen(&self, handler: InboundHandler) -> Result<(), TransportError> {
        let reader = self
            .reader
            .lock()
            .take()
            .ok_or(TransportError::AlreadyListening)?;

        tokio::spawn(read_loop(reader, handler));
        Ok(())
    }

    fn post(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        let line = serde_json::to_string(frame).map_err(|e| TransportError::Send(e.to_string()))?;
        self.outbound
            .send(line)
            .map_err(|_| TransportError::Closed)
    }
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            error!("Failed to write frame: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            error!("Failed to flush frame: {}", e);
            break;
        }
    }
    debug!("Stream writer stopped");
}

async fn read_loop(reader: BoxedReader, handler: InboundHandler) {
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(line) {
                    Ok(value) => handler(value),
                    Err(e) => trace!("Discarding non-JSON line: {}", e),
                }
            }
            Ok(None) => {
                debug!("Stream reader reached EOF");
                break;
            }
            Err(e) => {
                warn!("Error reading from stream: {}", e);
                break;
            }
        }
    }
}
