use crate::messages::handshake::DEFAULT_HANDSHAKE_ORIGIN;
use crate::messages::{
    consume_handshake, handshake_request, Frame, FrameParser, ReceiveBuffer, WireConfig,
    HANDSHAKE_SKIP_CODE, IDENTIFY_CODE,
};
use crate::network::connection::{ConnectFuture, ConnectionError, Connector};
use crate::network::dispatcher::{DispatchContext, Dispatcher};
use crate::network::liveness::{LivenessMonitor, DEFAULT_LIVENESS_TIMEOUT};
use crate::network::phase::Phase;
use crate::network::receiver;
use crate::ticket::{
    Credentials, TicketCache, TicketError, TicketIssuer, TicketManager,
    DEFAULT_TICKET_RENEWAL_INTERVAL,
};
use serde_json::{Map, Value};
use std::io;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, trace, warn};

pub const DEFAULT_CHAT_HOST: &str = "chat.f-list.net";
pub const DEFAULT_CHAT_PORT: u16 = 9722;
pub const DEFAULT_CLIENT_NAME: &str = "chatwire";

/// Runtime settings of one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// Send the legacy upgrade request before identifying.
    pub legacy_handshake: bool,
    pub handshake_origin: String,
    pub liveness_timeout: Duration,
    pub ticket_renewal_interval: Duration,
    pub wire: WireConfig,
    pub client_name: String,
    pub client_version: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CHAT_HOST.to_string(),
            port: DEFAULT_CHAT_PORT,
            legacy_handshake: true,
            handshake_origin: DEFAULT_HANDSHAKE_ORIGIN.to_string(),
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
            ticket_renewal_interval: DEFAULT_TICKET_RENEWAL_INTERVAL,
            wire: WireConfig::default(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug)]
enum Command {
    Send(Frame),
    Close,
}

/// Control surface of a running [`Session`].
///
/// Cheap to clone. Every method keeps working after the session ended; sends
/// and close requests are then silently dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    phase: watch::Receiver<Phase>,
}

impl SessionHandle {
    /// Queue a frame for the server. Returns false once the session is gone.
    pub fn send(&self, frame: Frame) -> bool {
        self.commands.send(Command::Send(frame)).is_ok()
    }

    /// Log out: the session tears down and `run` returns `Ok(())`.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Wait until the session reaches `target` or a terminal phase, and return
    /// the phase observed.
    pub async fn wait_for_phase(&self, target: Phase) -> Phase {
        let mut phase = self.phase.clone();
        loop {
            let current = *phase.borrow_and_update();
            if current == target || current.is_terminal() {
                return current;
            }
            if phase.changed().await.is_err() {
                return *phase.borrow();
            }
        }
    }
}

enum Event<S> {
    Readable(io::Result<usize>),
    Connected(io::Result<S>),
    Ticket(Result<String, TicketError>),
    LivenessExpired,
    Command(Option<Command>),
}

/// One logged-in account's connection to the chat server.
///
/// All state is owned by the task running [`Session::run`]. The socket read,
/// the outstanding connect, the ticket manager, the liveness deadline and the
/// handle's commands are raced in a single `select!`; every state change
/// happens after the race resolves.
pub struct Session<C: Connector, I, D> {
    config: SessionConfig,
    connector: C,
    tickets: TicketManager<I>,
    dispatcher: D,
    phase: Phase,
    phase_tx: watch::Sender<Phase>,
    stream: Option<C::Stream>,
    connecting: Option<ConnectFuture<C::Stream>>,
    buffer: ReceiveBuffer,
    parser: FrameParser,
    liveness: LivenessMonitor,
    commands: mpsc::UnboundedReceiver<Command>,
    commands_open: bool,
}

impl<C, I, D> Session<C, I, D>
where
    C: Connector,
    I: TicketIssuer,
    D: Dispatcher,
{
    pub fn new(
        config: SessionConfig,
        credentials: Credentials,
        connector: C,
        issuer: I,
        cache: TicketCache,
        dispatcher: D,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(Phase::Offline);

        let tickets = TicketManager::new(
            issuer,
            credentials,
            cache,
            config.ticket_renewal_interval,
        );
        let session = Self {
            parser: FrameParser::new(config.wire.clone()),
            liveness: LivenessMonitor::new(config.liveness_timeout),
            config,
            connector,
            tickets,
            dispatcher,
            phase: Phase::Offline,
            phase_tx,
            stream: None,
            connecting: None,
            buffer: ReceiveBuffer::new(),
            commands: command_rx,
            commands_open: true,
        };
        let handle = SessionHandle {
            commands: command_tx,
            phase: phase_rx,
        };
        (session, handle)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Log in and drive the session until it fails or is closed.
    ///
    /// Requests the first ticket immediately. On return the socket, both
    /// timers and any outstanding request or connect have been released.
    #[instrument(
        name = "session",
        skip(self),
        fields(
            account = %self.tickets.credentials().account,
            character = %self.tickets.credentials().character,
            server = %format!("{}:{}", self.config.host, self.config.port)
        )
    )]
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!("Logging in");
        self.tickets.schedule(Duration::ZERO);

        let result = self.event_loop().await;
        match &result {
            Ok(()) => {
                self.shutdown_stream().await;
                self.teardown(Phase::Closed);
                info!("Session closed");
            }
            Err(e) => {
                self.teardown(Phase::Failed);
                error!(kind = ?e.kind(), error = %e, "Session failed");
            }
        }
        result
    }

    async fn event_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let event = tokio::select! {
                read = receiver::read_available(&mut self.stream, &mut self.buffer) => {
                    Event::Readable(read)
                }
                connected = await_connect(&mut self.connecting) => Event::Connected(connected),
                outcome = self.tickets.next_outcome() => Event::Ticket(outcome),
                () = self.liveness.expired() => Event::LivenessExpired,
                command = self.commands.recv(), if self.commands_open => Event::Command(command),
            };

            match event {
                Event::Readable(read) => self.on_readable(read).await?,
                Event::Connected(Ok(stream)) => self.on_connected(stream).await?,
                Event::Connected(Err(e)) => {
                    error!(error = %e, "Connect failed");
                    return Err(ConnectionError::ConnectFailed(e));
                }
                Event::Ticket(outcome) => self.on_ticket(outcome)?,
                Event::LivenessExpired => {
                    warn!(timeout = ?self.liveness.timeout(), "No ping from server");
                    return Err(ConnectionError::TimedOut {
                        timeout: self.liveness.timeout(),
                    });
                }
                Event::Command(Some(Command::Send(frame))) => self.send_frame(&frame).await?,
                Event::Command(Some(Command::Close)) => {
                    info!("Logout requested");
                    return Ok(());
                }
                Event::Command(None) => {
                    debug!("All session handles dropped");
                    self.commands_open = false;
                }
            }
        }
    }

    fn on_ticket(&mut self, outcome: Result<String, TicketError>) -> Result<(), ConnectionError> {
        match (self.phase, outcome) {
            (Phase::Offline, Ok(_)) => {
                self.transition(Phase::Connect)?;
                info!(host = %self.config.host, port = self.config.port, "Connecting");
                self.connecting = Some(self.connector.connect(&self.config.host, self.config.port));
                Ok(())
            }
            (Phase::Offline, Err(e)) => Err(e.into()),
            (phase, Ok(_)) => {
                debug!(%phase, "Ticket renewed");
                Ok(())
            }
            (phase, Err(e)) => {
                warn!(%phase, error = %e, "Ticket renewal failed, keeping the cached ticket");
                Ok(())
            }
        }
    }

    async fn on_connected(&mut self, stream: C::Stream) -> Result<(), ConnectionError> {
        info!("Connected");
        self.stream = Some(stream);
        self.liveness.reset();

        if self.config.legacy_handshake {
            self.transition(Phase::Handshake)?;
            let request = handshake_request(
                &self.config.host,
                self.config.port,
                &self.config.handshake_origin,
            );
            self.write_bytes(&request).await
        } else {
            self.transition(Phase::Identify)?;
            // Identify right behind the skip frame; no server reply comes in between.
            let skip = Frame::new(HANDSHAKE_SKIP_CODE).encode()?;
            self.write_bytes(&skip).await?;
            self.send_identify().await
        }
    }

    async fn on_readable(&mut self, read: io::Result<usize>) -> Result<(), ConnectionError> {
        if !receiver::on_readable(read)? {
            return Ok(());
        }

        if self.phase == Phase::Handshake {
            if !consume_handshake(&mut self.buffer) {
                trace!(buffered = self.buffer.len(), "Waiting for the rest of the handshake");
                return Ok(());
            }
            debug!(remaining = self.buffer.len(), "Handshake complete");
            self.transition(Phase::Identify)?;
            self.send_identify().await?;
        }

        while let Some(frame) = self.parser.next_frame(&mut self.buffer)? {
            self.deliver(frame).await?;
        }
        Ok(())
    }

    async fn deliver(&mut self, frame: Frame) -> Result<(), ConnectionError> {
        if self.phase == Phase::Identify && frame.code() != HANDSHAKE_SKIP_CODE {
            self.transition(Phase::Active)?;
            info!("Session active");
        }

        let mut ctx = DispatchContext::new(self.phase);
        self.dispatcher.dispatch(&frame, &mut ctx);

        if ctx.ping_received() {
            self.liveness.reset();
        }
        for outbound in ctx.into_outbound() {
            self.send_frame(&outbound).await?;
        }
        Ok(())
    }

    fn identify_frame(&self) -> Frame {
        let credentials = self.tickets.credentials();
        let mut payload = Map::new();
        if let Some(ticket) = self.tickets.current_ticket() {
            payload.insert("method".to_string(), Value::from("ticket"));
            payload.insert("ticket".to_string(), Value::from(ticket));
            payload.insert("account".to_string(), Value::from(credentials.account.as_str()));
            payload.insert("cname".to_string(), Value::from(self.config.client_name.as_str()));
            payload.insert(
                "cversion".to_string(),
                Value::from(self.config.client_version.as_str()),
            );
        }
        payload.insert(
            "character".to_string(),
            Value::from(credentials.character.as_str()),
        );
        Frame::with_payload(IDENTIFY_CODE, payload)
    }

    async fn send_identify(&mut self) -> Result<(), ConnectionError> {
        let frame = self.identify_frame();
        debug!("Identifying");
        let bytes = frame.encode()?;
        self.write_bytes(&bytes).await
    }

    /// Write an application frame. Frames that cannot be encoded, or that
    /// arrive before the session can carry them, are dropped.
    async fn send_frame(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        if !matches!(self.phase, Phase::Identify | Phase::Active) {
            warn!(code = frame.code(), phase = %self.phase, "Dropping frame, session not ready");
            return Ok(());
        }
        match frame.encode() {
            Ok(bytes) => {
                trace!(frame = %frame, "Sending frame");
                self.write_bytes(&bytes).await
            }
            Err(e) => {
                warn!(code = frame.code(), error = %e, "Dropping unencodable frame");
                Ok(())
            }
        }
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ConnectionError::ConnectionClosed);
        };

        // A server that stops reading must not outlive the ping timeout.
        let write = async {
            stream.write_all(bytes).await?;
            stream.flush().await
        };
        tokio::select! {
            result = write => result?,
            () = self.liveness.expired() => {
                warn!(
                    timeout = ?self.liveness.timeout(),
                    pending = bytes.len(),
                    "Write stalled past the ping timeout"
                );
                return Err(ConnectionError::TimedOut {
                    timeout: self.liveness.timeout(),
                });
            }
        }
        trace!(size = bytes.len(), "Wrote bytes");
        Ok(())
    }

    fn transition(&mut self, next: Phase) -> Result<(), ConnectionError> {
        let previous = self.phase;
        self.phase.transition_to(next)?;
        self.phase_tx.send_replace(next);
        debug!(from = %previous, to = %next, "Phase changed");
        Ok(())
    }

    async fn shutdown_stream(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        tokio::select! {
            result = stream.shutdown() => {
                if let Err(e) = result {
                    debug!(error = %e, "Socket shutdown failed");
                }
            }
            () = self.liveness.expired() => debug!("Socket shutdown stalled, dropping it"),
        }
    }

    fn teardown(&mut self, terminal: Phase) {
        self.stream = None;
        self.connecting = None;
        self.liveness.cancel();
        self.tickets.cancel();
        self.buffer.clear();

        if let Err(e) = self.transition(terminal) {
            debug!(error = %e, "Session already terminal");
        }
    }
}

async fn await_connect<S>(connecting: &mut Option<ConnectFuture<S>>) -> io::Result<S> {
    let Some(connect) = connecting.as_mut() else {
        return std::future::pending().await;
    };
    let result = connect.await;
    *connecting = None;
    result
}
