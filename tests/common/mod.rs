//! Common test utilities and helper modules
//!
//! Fake collaborators for driving a [`chatwire::Session`] end to end: an
//! in-memory connector whose far side plays the chat server, a scripted ticket
//! issuer and a dispatcher that records what it receives.

#![allow(dead_code)]

pub mod fake_server;
pub mod scripted;

use chatwire::network::{Session, SessionConfig, SessionHandle};
use chatwire::ticket::{Credentials, TicketCache};
use fake_server::{DuplexConnector, ServerAccepts};
use scripted::{RecordingDispatcher, ScriptedIssuer};
use std::sync::Arc;

pub const ACCOUNT: &str = "alice";
pub const CHARACTER: &str = "Alice Liddell";
pub const TEST_HOST: &str = "chat.test";
pub const TEST_PORT: u16 = 9722;

pub fn credentials() -> Credentials {
    Credentials::new(ACCOUNT, "hunter2", CHARACTER)
}

pub fn session_config(legacy_handshake: bool) -> SessionConfig {
    SessionConfig {
        host: TEST_HOST.to_string(),
        port: TEST_PORT,
        legacy_handshake,
        ..SessionConfig::default()
    }
}

pub type TestSession = Session<DuplexConnector, Arc<ScriptedIssuer>, RecordingDispatcher>;

/// Everything a test needs to drive one session.
pub struct Harness {
    pub session: TestSession,
    pub handle: SessionHandle,
    pub accepts: ServerAccepts,
    pub issuer: Arc<ScriptedIssuer>,
    pub dispatcher: RecordingDispatcher,
    pub cache: TicketCache,
    pub connector: DuplexConnector,
}

pub fn harness(config: SessionConfig, issuer: Arc<ScriptedIssuer>) -> Harness {
    harness_with_connector(config, issuer, DuplexConnector::new())
}

pub fn harness_with_connector(
    config: SessionConfig,
    issuer: Arc<ScriptedIssuer>,
    (connector, accepts): (DuplexConnector, ServerAccepts),
) -> Harness {
    let dispatcher = RecordingDispatcher::new();
    let cache = TicketCache::new();
    let (session, handle) = Session::new(
        config,
        credentials(),
        connector.clone(),
        issuer.clone(),
        cache.clone(),
        dispatcher.clone(),
    );
    Harness {
        session,
        handle,
        accepts,
        issuer,
        dispatcher,
        cache,
        connector,
    }
}
