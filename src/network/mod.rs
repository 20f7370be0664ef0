pub mod connection;
pub mod dispatcher;
pub mod liveness;
pub mod phase;
pub mod receiver;
pub mod session;

pub use connection::{ConnectFuture, ConnectionError, Connector, ErrorKind, TcpConnector};
pub use dispatcher::{DispatchContext, Dispatcher};
pub use liveness::{LivenessMonitor, DEFAULT_LIVENESS_TIMEOUT};
pub use phase::{InvalidTransition, Phase};
pub use session::{
    Session, SessionConfig, SessionHandle, DEFAULT_CHAT_HOST, DEFAULT_CHAT_PORT,
    DEFAULT_CLIENT_NAME,
};
