use crate::messages::ProtocolError;
use crate::network::phase::InvalidTransition;
use crate::ticket::TicketError;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Why a session ended. Every variant is fatal; the session reports exactly one.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("The connection has failed: {0}")]
    Io(#[from] io::Error),

    #[error("The connection was closed by the server.")]
    ConnectionClosed,

    #[error("Unable to open a connection: {0}")]
    ConnectFailed(#[source] io::Error),

    #[error("Connection timed out after {timeout:?} without a ping.")]
    TimedOut { timeout: Duration },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// Coarse classification of a [`ConnectionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Socket failure, closed socket, failed connect or liveness timeout.
    Network,
    /// The server sent bytes that are not a valid frame stream.
    Protocol,
    /// The first ticket could not be obtained.
    Ticket,
}

impl ConnectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::Io(_)
            | ConnectionError::ConnectionClosed
            | ConnectionError::ConnectFailed(_)
            | ConnectionError::TimedOut { .. } => ErrorKind::Network,
            ConnectionError::Protocol(_) | ConnectionError::InvalidTransition(_) => {
                ErrorKind::Protocol
            }
            ConnectionError::Ticket(_) => ErrorKind::Ticket,
        }
    }
}

pub type ConnectFuture<S> = Pin<Box<dyn Future<Output = io::Result<S>> + Send + 'static>>;

/// Opens the byte stream to the chat server.
pub trait Connector: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn connect(&self, host: &str, port: u16) -> ConnectFuture<Self::Stream>;
}

/// Plain TCP connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, host: &str, port: u16) -> ConnectFuture<TcpStream> {
        let address = format!("{}:{}", host, port);
        Box::pin(async move {
            debug!(address = %address, "Opening TCP connection");
            let stream = TcpStream::connect(&address).await?;
            stream.set_nodelay(true)?;
            Ok(stream)
        })
    }
}
