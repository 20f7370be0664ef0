pub mod buffer;
pub mod frame;
pub mod handshake;
pub mod wire;

pub use buffer::ReceiveBuffer;
pub use frame::Frame;
pub use handshake::{consume_handshake, handshake_request, HANDSHAKE_TOKEN_LEN};
pub use wire::{
    // Core wire protocol types
    FrameParser,
    ProtocolError,
    WireConfig,

    // Wire protocol constants
    CODE_LEN,
    CONTROL_BYTE,
    DEFAULT_MAX_FRAME_SIZE,
    HANDSHAKE_SKIP_CODE,
    IDENTIFY_CODE,
    SENTINEL_BYTE,
    SEPARATOR_BYTE,
};
