use bytes::{Buf, BytesMut};

/// Initial capacity of a session receive buffer.
pub const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Growable receive buffer shared by the handshake consumer and the frame parser.
///
/// Consumed bytes are released from the front with [`ReceiveBuffer::advance`],
/// which only moves the start offset. The backing storage is reclaimed by
/// `BytesMut` when the buffer is drained or needs to grow.
///
/// [`ReceiveBuffer::find`] remembers how far it has searched, so a frame
/// arriving over many reads is scanned once rather than once per read.
#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    inner: BytesMut,
    /// Bytes before this offset are known not to contain the last searched byte.
    scanned: usize,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        Self {
            inner: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scanned: 0,
        }
    }

    /// Unconsumed bytes, in arrival order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.inner.extend_from_slice(data);
    }

    /// Position of the first `byte`, resuming where the previous search stopped.
    ///
    /// Only valid when successive calls look for the same byte; the offset is
    /// shared.
    pub fn find(&mut self, byte: u8) -> Option<usize> {
        let start = self.scanned.min(self.inner.len());
        match self.inner[start..].iter().position(|&b| b == byte) {
            Some(offset) => {
                self.scanned = start + offset;
                Some(start + offset)
            }
            None => {
                self.scanned = self.inner.len();
                None
            }
        }
    }

    /// Drop `count` bytes from the front. Panics if `count > len()`.
    pub fn advance(&mut self, count: usize) {
        self.inner.advance(count);
        self.scanned = self.scanned.saturating_sub(count);
    }

    /// Writable backing storage for socket reads.
    pub fn bytes_mut(&mut self) -> &mut BytesMut {
        &mut self.inner
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.scanned = 0;
    }
}
