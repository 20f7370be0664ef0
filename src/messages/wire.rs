use crate::messages::{Frame, ReceiveBuffer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, instrument, trace};

// Wire protocol constants
pub const CONTROL_BYTE: u8 = 0x00;
pub const SENTINEL_BYTE: u8 = 0xFF;
pub const SEPARATOR_BYTE: u8 = 0x20;
pub const CODE_LEN: usize = 3;

/// Sent instead of the legacy upgrade handshake. The server never attaches JSON to it.
pub const HANDSHAKE_SKIP_CODE: &str = "WSH";
/// Identify frame carrying the ticket and character name.
pub const IDENTIFY_CODE: &str = "IDN";

pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024; // 1MB

/// Errors raised while decoding or encoding frames. All of them end the session.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid frame data (expected control byte 0x00, found {found:#04x})")]
    MissingControlByte { found: u8 },

    #[error("Invalid frame data (frame of {length} bytes is too short for a code)")]
    FrameTooShort { length: usize },

    #[error("Invalid frame code: {code:?}")]
    InvalidCode { code: String },

    #[error("Invalid frame data (expecting JSON): {0}")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("Invalid frame data (JSON not an object, got {kind})")]
    PayloadNotObject { kind: &'static str },

    #[error("Frame too large: {size} bytes, maximum is {max_size} bytes")]
    FrameTooLarge { size: usize, max_size: usize },
}

/// Configuration for frame parsing limits
#[derive(Debug, Clone)]
pub struct WireConfig {
    pub max_frame_size: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl WireConfig {
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

/// Extracts complete frames from a [`ReceiveBuffer`].
///
/// The parser is stateless between calls: everything it needs lives in the
/// buffer, so a frame split across any number of reads is picked up once its
/// sentinel byte arrives. Bytes are only consumed for a frame that was fully
/// decoded.
#[derive(Debug, Clone, Default)]
pub struct FrameParser {
    config: WireConfig,
}

impl FrameParser {
    pub fn new(config: WireConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    /// Decode the next complete frame, if any.
    ///
    /// Returns `Ok(None)` when the buffer is empty or only holds the start of a
    /// frame. On error the buffer is left untouched; the caller is expected to
    /// tear the session down.
    #[instrument(level = "trace", skip(self, buffer), fields(buffered = buffer.len()))]
    pub fn next_frame(&self, buffer: &mut ReceiveBuffer) -> Result<Option<Frame>, ProtocolError> {
        let Some(&first) = buffer.as_bytes().first() else {
            return Ok(None);
        };

        if first != CONTROL_BYTE {
            error!(found = first, "Frame does not start with the control byte");
            return Err(ProtocolError::MissingControlByte { found: first });
        }

        let max_size = self.config.max_frame_size;
        let Some(end) = buffer.find(SENTINEL_BYTE) else {
            if buffer.len() > max_size {
                error!(size = buffer.len(), max_size, "Buffered frame exceeds maximum size");
                return Err(ProtocolError::FrameTooLarge {
                    size: buffer.len(),
                    max_size,
                });
            }
            trace!("Incomplete frame, waiting for more data");
            return Ok(None);
        };

        // Sentinel included
        if end + 1 > max_size {
            error!(size = end + 1, max_size, "Frame exceeds maximum size");
            return Err(ProtocolError::FrameTooLarge {
                size: end + 1,
                max_size,
            });
        }

        let frame = decode_frame(&buffer.as_bytes()[..end])?;
        buffer.advance(end + 1);

        debug!(code = frame.code(), remaining = buffer.len(), "Decoded frame");
        Ok(Some(frame))
    }
}

/// Decode a frame body: everything up to, but not including, the sentinel byte.
fn decode_frame(body: &[u8]) -> Result<Frame, ProtocolError> {
    let code_end = 1 + CODE_LEN;
    if body.len() < code_end {
        return Err(ProtocolError::FrameTooShort { length: body.len() + 1 });
    }

    let code = std::str::from_utf8(&body[1..code_end]).map_err(|_| ProtocolError::InvalidCode {
        code: String::from_utf8_lossy(&body[1..code_end]).into_owned(),
    })?;

    if body.len() == code_end || code == HANDSHAKE_SKIP_CODE {
        return Ok(Frame::new(code));
    }

    // One separator byte sits between the code and the payload.
    let json = &body[code_end + 1..];
    trace!(json = %String::from_utf8_lossy(json), "JSON received");

    let value: Value = serde_json::from_slice(json).map_err(|e| {
        error!(error = %e, code, "Frame payload is not valid JSON");
        ProtocolError::InvalidPayload(e)
    })?;

    match value {
        Value::Object(payload) => Ok(Frame::with_payload(code, payload)),
        other => {
            let kind = value_kind(&other);
            error!(code, kind, "Frame payload is not a JSON object");
            Err(ProtocolError::PayloadNotObject { kind })
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
