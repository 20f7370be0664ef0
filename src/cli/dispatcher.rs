use crate::messages::Frame;
use crate::network::{DispatchContext, Dispatcher};
use tracing::{info, trace, warn};

/// Code of the server's keep-alive frame
pub const PING_CODE: &str = "PIN";
/// Code of a server error report
pub const ERROR_CODE: &str = "ERR";

/// Minimal dispatcher for the command-line client.
///
/// Answers pings, reports them as liveness signals, and logs everything else.
#[derive(Debug, Default)]
pub struct LoggingDispatcher {
    received: u64,
}

impl LoggingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> u64 {
        self.received
    }
}

impl Dispatcher for LoggingDispatcher {
    fn dispatch(&mut self, frame: &Frame, ctx: &mut DispatchContext) {
        self.received += 1;

        match frame.code() {
            PING_CODE => {
                trace!("Ping");
                ctx.receive_ping();
                ctx.send(Frame::new(PING_CODE));
            }
            ERROR_CODE => {
                warn!(
                    number = ?frame.payload().and_then(|p| p.get("number")),
                    message = frame.get_str("message").unwrap_or_default(),
                    "Server reported an error"
                );
            }
            code => {
                info!(code, phase = %ctx.phase(), "Received frame");
                trace!(frame = %frame, "Frame contents");
            }
        }
    }
}
