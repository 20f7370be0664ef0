use chatwire::messages::Frame;
use chatwire::network::{DispatchContext, Dispatcher, Phase};
use chatwire::ticket::{Credentials, TicketError, TicketFuture, TicketIssuer, TicketResponse};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Ticket issuer that replays scripted responses and records request times.
///
/// Once the script runs out every request fails with a transport error.
#[derive(Default)]
pub struct ScriptedIssuer {
    responses: Mutex<VecDeque<Result<TicketResponse, TicketError>>>,
    requested_at: Mutex<Vec<Instant>>,
}

impl ScriptedIssuer {
    pub fn new(responses: Vec<Result<TicketResponse, TicketError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requested_at: Mutex::new(Vec::new()),
        })
    }

    pub fn granting(ticket: &str) -> Arc<Self> {
        Self::new(vec![Ok(TicketResponse::success(ticket))])
    }

    pub fn request_times(&self) -> Vec<Instant> {
        self.requested_at.lock().unwrap().clone()
    }

    pub fn requests(&self) -> usize {
        self.requested_at.lock().unwrap().len()
    }
}

impl TicketIssuer for ScriptedIssuer {
    fn request_ticket(&self, _credentials: &Credentials) -> TicketFuture {
        self.requested_at.lock().unwrap().push(Instant::now());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TicketError::Transport("script exhausted".to_string())));
        Box::pin(async move { response })
    }
}

/// Dispatcher that records every frame with the phase it arrived in.
///
/// `PIN` frames are reported as liveness signals; frames queued with
/// [`RecordingDispatcher::reply_to`] are sent back in response to a code.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    frames: Arc<Mutex<Vec<(Frame, Phase)>>>,
    replies: Arc<Mutex<Vec<(String, Frame)>>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_to(&self, code: &str, reply: Frame) {
        self.replies.lock().unwrap().push((code.to_string(), reply));
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().iter().map(|(f, _)| f.clone()).collect()
    }

    pub fn codes(&self) -> Vec<String> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|(f, _)| f.code().to_string())
            .collect()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.frames.lock().unwrap().iter().map(|(_, p)| *p).collect()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&mut self, frame: &Frame, ctx: &mut DispatchContext) {
        self.frames.lock().unwrap().push((frame.clone(), ctx.phase()));
        if frame.code() == "PIN" {
            ctx.receive_ping();
        }
        for (code, reply) in self.replies.lock().unwrap().iter() {
            if code == frame.code() {
                ctx.send(reply.clone());
            }
        }
    }
}
