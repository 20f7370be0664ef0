use crate::messages::ReceiveBuffer;
use crate::network::ConnectionError;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{error, trace};

/// Spare capacity reserved before every socket read.
pub const READ_CHUNK_SIZE: usize = 4096;

/// Wait for the socket to become readable and append what arrives to `buffer`.
///
/// Never resolves while there is no socket. Cancel safe: bytes are only
/// appended by a read that completed.
pub async fn read_available<S>(stream: &mut Option<S>, buffer: &mut ReceiveBuffer) -> io::Result<usize>
where
    S: AsyncRead + Unpin,
{
    let Some(stream) = stream.as_mut() else {
        return std::future::pending().await;
    };
    buffer.bytes_mut().reserve(READ_CHUNK_SIZE);
    stream.read_buf(buffer.bytes_mut()).await
}

/// Interpret the result of [`read_available`].
///
/// Returns whether new bytes arrived. Would-block and interrupted reads are
/// not errors; the next readiness notification retries. End of stream and any
/// other I/O error end the session.
pub fn on_readable(result: io::Result<usize>) -> Result<bool, ConnectionError> {
    match result {
        Ok(0) => {
            error!("Server closed the connection");
            Err(ConnectionError::ConnectionClosed)
        }
        Ok(read) => {
            trace!(read, "Received bytes");
            Ok(true)
        }
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
            trace!(error = %e, "Read not ready, retrying later");
            Ok(false)
        }
        Err(e) => {
            error!(error = %e, "Socket read failed");
            Err(ConnectionError::Io(e))
        }
    }
}
