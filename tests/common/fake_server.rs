//! In-memory chat server
//!
//! [`DuplexConnector`] hands the session one end of a `tokio::io::duplex`
//! pipe per connect and publishes the other end as a [`FakeServer`].

use chatwire::messages::{Frame, FrameParser, ReceiveBuffer, HANDSHAKE_TOKEN_LEN};
use chatwire::network::{ConnectFuture, Connector};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

const PIPE_CAPACITY: usize = 64 * 1024;

pub type ServerAccepts = mpsc::UnboundedReceiver<FakeServer>;

#[derive(Clone)]
pub struct DuplexConnector {
    servers: mpsc::UnboundedSender<FakeServer>,
    attempts: Arc<AtomicUsize>,
    refuse: bool,
}

impl DuplexConnector {
    pub fn new() -> (Self, ServerAccepts) {
        Self::build(false)
    }

    /// A connector whose every attempt fails with `ConnectionRefused`.
    pub fn refusing() -> (Self, ServerAccepts) {
        Self::build(true)
    }

    fn build(refuse: bool) -> (Self, ServerAccepts) {
        let (servers, accepts) = mpsc::unbounded_channel();
        let connector = Self {
            servers,
            attempts: Arc::new(AtomicUsize::new(0)),
            refuse,
        };
        (connector, accepts)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for DuplexConnector {
    type Stream = DuplexStream;

    fn connect(&self, _host: &str, _port: u16) -> ConnectFuture<DuplexStream> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Box::pin(async {
                Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
            });
        }

        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
        let _ = self.servers.send(FakeServer::new(server));
        Box::pin(async move { Ok(client) })
    }
}

/// Server side of one connection.
pub struct FakeServer {
    stream: DuplexStream,
    parser: FrameParser,
    buffer: ReceiveBuffer,
}

impl FakeServer {
    fn new(stream: DuplexStream) -> Self {
        Self {
            stream,
            parser: FrameParser::default(),
            buffer: ReceiveBuffer::new(),
        }
    }

    /// Read exactly `len` raw bytes written by the client.
    pub async fn read_raw(&mut self, len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        self.stream.read_exact(&mut data).await.unwrap();
        data
    }

    /// Read the next complete frame written by the client.
    pub async fn read_frame(&mut self) -> Frame {
        loop {
            if let Some(frame) = self.parser.next_frame(&mut self.buffer).unwrap() {
                return frame;
            }
            let byte = self.stream.read_u8().await.unwrap();
            self.buffer.extend_from_slice(&[byte]);
        }
    }

    pub async fn send(&mut self, frame: &Frame) {
        self.send_raw(&frame.encode().unwrap()).await;
    }

    pub async fn send_raw(&mut self, data: &[u8]) {
        self.stream.write_all(data).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Half-close: the client sees end of stream, the server can still read.
    pub async fn close_write(&mut self) {
        self.stream.shutdown().await.unwrap();
    }

    /// Read and discard until the client hangs up; returns the bytes skipped.
    pub async fn drain_until_closed(&mut self) -> usize {
        let mut skipped = 0;
        let mut chunk = [0u8; 4096];
        loop {
            match self.stream.read(&mut chunk).await.unwrap() {
                0 => return skipped,
                read => skipped += read,
            }
        }
    }

    /// Try to read; `Ok(0)` means the client hung up.
    pub async fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf).await
    }

    pub fn into_stream(self) -> DuplexStream {
        self.stream
    }
}

/// Reply header block of a legacy upgrade, without the trailing token.
pub const UPGRADE_REPLY: &[u8] = b"HTTP/1.1 101 WebSocket Protocol Handshake\r\n\
Upgrade: WebSocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Origin: http://www.f-list.net\r\n\
Sec-WebSocket-Location: ws://chat.test:9722/\r\n\
\r\n";

/// Full legacy upgrade reply: header block plus the 16-byte token.
pub fn upgrade_reply() -> Vec<u8> {
    let mut reply = UPGRADE_REPLY.to_vec();
    reply.extend_from_slice(&[b'k'; HANDSHAKE_TOKEN_LEN]);
    reply
}
