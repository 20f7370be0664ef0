use crate::messages::Frame;
use crate::network::Phase;

/// Receives every complete frame of a session, in arrival order.
///
/// The connection core never interprets frame codes. Whatever the dispatcher
/// wants the session to do in response goes through the [`DispatchContext`].
pub trait Dispatcher: Send {
    fn dispatch(&mut self, frame: &Frame, ctx: &mut DispatchContext);
}

/// Requests a dispatcher makes of its session while handling one frame.
///
/// Outbound frames are written in the order they were queued, after the
/// dispatch call returns and before the next frame is parsed.
#[derive(Debug)]
pub struct DispatchContext {
    phase: Phase,
    outbound: Vec<Frame>,
    ping_received: bool,
}

impl DispatchContext {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            outbound: Vec::new(),
            ping_received: false,
        }
    }

    /// Session phase at the time the frame arrived.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Queue a frame for the server.
    pub fn send(&mut self, frame: Frame) {
        self.outbound.push(frame);
    }

    /// Report that this frame was a liveness signal; restarts the ping timeout.
    pub fn receive_ping(&mut self) {
        self.ping_received = true;
    }

    pub fn ping_received(&self) -> bool {
        self.ping_received
    }

    pub fn into_outbound(self) -> Vec<Frame> {
        self.outbound
    }
}

impl<D: Dispatcher + ?Sized> Dispatcher for Box<D> {
    fn dispatch(&mut self, frame: &Frame, ctx: &mut DispatchContext) {
        (**self).dispatch(frame, ctx)
    }
}
