pub mod cli;
pub mod messages;
pub mod network;
pub mod ticket;
pub mod timer;

// Re-export key types for easy testing
pub use messages::{Frame, FrameParser, ProtocolError, ReceiveBuffer};
pub use network::{
    ConnectionError, Connector, DispatchContext, Dispatcher, ErrorKind, Phase, Session,
    SessionConfig, SessionHandle,
};
pub use ticket::{Credentials, TicketCache, TicketError, TicketIssuer, TicketResponse};
