mod common;

use chatwire::messages::handshake::DEFAULT_HANDSHAKE_ORIGIN;
use chatwire::messages::{handshake_request, Frame};
use chatwire::network::{ConnectionError, ErrorKind, Phase};
use chatwire::ticket::{TicketError, TicketResponse};
use common::fake_server::{upgrade_reply, DuplexConnector, UPGRADE_REPLY};
use common::scripted::ScriptedIssuer;
use common::{harness, harness_with_connector, session_config, ACCOUNT, CHARACTER, TEST_HOST, TEST_PORT};
use serde_json::json;
use std::time::Duration;

fn frame(code: &str, payload: serde_json::Value) -> Frame {
    Frame::with_payload(code, payload.as_object().unwrap().clone())
}

#[tokio::test(start_paused = true)]
async fn test_legacy_handshake_session() {
    let mut h = harness(session_config(true), ScriptedIssuer::granting("ticket-1"));
    let handle = h.handle.clone();
    let task = tokio::spawn(h.session.run());

    let mut server = h.accepts.recv().await.unwrap();
    let expected = handshake_request(TEST_HOST, TEST_PORT, DEFAULT_HANDSHAKE_ORIGIN);
    assert_eq!(server.read_raw(expected.len()).await, expected);
    assert_eq!(handle.phase(), Phase::Handshake);

    // Reply, token and the first frame in a single write
    let hello = frame("HLO", json!({"message": "Welcome!"}));
    let mut reply = upgrade_reply();
    reply.extend_from_slice(&hello.encode().unwrap());
    server.send_raw(&reply).await;

    let identify = server.read_frame().await;
    assert_eq!(identify.code(), "IDN");
    assert_eq!(identify.get_str("method"), Some("ticket"));
    assert_eq!(identify.get_str("ticket"), Some("ticket-1"));
    assert_eq!(identify.get_str("account"), Some(ACCOUNT));
    assert_eq!(identify.get_str("character"), Some(CHARACTER));
    assert_eq!(identify.get_str("cname"), Some("chatwire"));
    assert!(identify.get_str("cversion").is_some());

    assert_eq!(handle.wait_for_phase(Phase::Active).await, Phase::Active);
    assert_eq!(h.dispatcher.frames(), vec![hello]);

    handle.close();
    assert!(task.await.unwrap().is_ok());
    assert_eq!(handle.phase(), Phase::Closed);
    assert_eq!(h.dispatcher.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_handshake_reply_split_across_reads() {
    let mut h = harness(session_config(true), ScriptedIssuer::granting("ticket-1"));
    let handle = h.handle.clone();
    let task = tokio::spawn(h.session.run());

    let mut server = h.accepts.recv().await.unwrap();
    let request_len = handshake_request(TEST_HOST, TEST_PORT, DEFAULT_HANDSHAKE_ORIGIN).len();
    server.read_raw(request_len).await;

    let reply = upgrade_reply();
    let (headers, token) = reply.split_at(UPGRADE_REPLY.len());
    server.send_raw(&headers[..10]).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    server.send_raw(&headers[10..]).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    server.send_raw(&token[..5]).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.phase(), Phase::Handshake);

    server.send_raw(&token[5..]).await;
    assert_eq!(server.read_frame().await.code(), "IDN");
    assert_eq!(handle.wait_for_phase(Phase::Identify).await, Phase::Identify);

    server.send(&Frame::new("PIN")).await;
    assert_eq!(handle.wait_for_phase(Phase::Active).await, Phase::Active);
    assert_eq!(h.dispatcher.codes(), vec!["PIN"]);

    handle.close();
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_skip_handshake_sends_wsh_then_identify() {
    let mut h = harness(session_config(false), ScriptedIssuer::granting("ticket-9"));
    let handle = h.handle.clone();
    let task = tokio::spawn(h.session.run());

    let mut server = h.accepts.recv().await.unwrap();
    assert_eq!(server.read_raw(5).await, b"\x00WSH\xff");
    let identify = server.read_frame().await;
    assert_eq!(identify.code(), "IDN");
    assert_eq!(identify.get_str("ticket"), Some("ticket-9"));
    assert_eq!(handle.phase(), Phase::Identify);

    // An echoed WSH is dispatched but does not count as the first application frame
    server.send(&Frame::new("WSH")).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.phase(), Phase::Identify);

    server.send(&frame("IDN", json!({"character": CHARACTER}))).await;
    assert_eq!(handle.wait_for_phase(Phase::Active).await, Phase::Active);
    assert_eq!(h.dispatcher.codes(), vec!["WSH", "IDN"]);
    assert_eq!(h.dispatcher.phases(), vec![Phase::Identify, Phase::Active]);

    handle.close();
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_first_ticket_failure_never_connects() {
    let (connector, accepts) = DuplexConnector::new();
    let h = harness_with_connector(
        session_config(true),
        ScriptedIssuer::new(vec![Ok(TicketResponse::failure("Invalid password."))]),
        (connector.clone(), accepts),
    );
    let handle = h.handle.clone();

    let err = h.session.run().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ticket);
    assert!(matches!(
        err,
        ConnectionError::Ticket(TicketError::Rejected(ref message)) if message == "Invalid password."
    ));
    assert_eq!(handle.phase(), Phase::Failed);
    assert_eq!(connector.attempts(), 0);
    assert_eq!(h.issuer.requests(), 1);
    assert_eq!(h.dispatcher.count(), 0);
    assert!(h.cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_ticket_field_is_fatal_on_first_login() {
    let h = harness(
        session_config(true),
        ScriptedIssuer::new(vec![Ok(TicketResponse::default())]),
    );

    let err = h.session.run().await.unwrap_err();
    assert!(matches!(err, ConnectionError::Ticket(TicketError::MissingTicket)));
    assert_eq!(err.to_string(), "No ticket returned.");
    assert_eq!(h.connector.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_is_fatal() {
    let h = harness_with_connector(
        session_config(true),
        ScriptedIssuer::granting("ticket-1"),
        DuplexConnector::refusing(),
    );
    let handle = h.handle.clone();

    let err = h.session.run().await.unwrap_err();
    assert!(matches!(err, ConnectionError::ConnectFailed(_)));
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.to_string().starts_with("Unable to open a connection"));
    assert_eq!(handle.phase(), Phase::Failed);
    assert_eq!(h.connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_server_hangup_fails_session() {
    let mut h = harness(session_config(false), ScriptedIssuer::granting("ticket-1"));
    let handle = h.handle.clone();
    let task = tokio::spawn(h.session.run());

    let mut server = h.accepts.recv().await.unwrap();
    server.read_raw(5).await;
    server.read_frame().await;
    drop(server);

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, ConnectionError::ConnectionClosed));
    assert_eq!(handle.phase(), Phase::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frame_is_fatal() {
    let mut h = harness(session_config(false), ScriptedIssuer::granting("ticket-1"));
    let task = tokio::spawn(h.session.run());

    let mut server = h.accepts.recv().await.unwrap();
    server.read_raw(5).await;
    server.read_frame().await;

    let mut data = Frame::new("PIN").encode().unwrap();
    data.extend_from_slice(b"HLO\xff");
    server.send_raw(&data).await;

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    // The well-formed frame ahead of the garbage was still delivered
    assert_eq!(h.dispatcher.codes(), vec!["PIN"]);

    let mut buf = [0u8; 16];
    assert_eq!(server.try_read(&mut buf).await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_non_object_payload_is_fatal() {
    let mut h = harness(session_config(false), ScriptedIssuer::granting("ticket-1"));
    let task = tokio::spawn(h.session.run());

    let mut server = h.accepts.recv().await.unwrap();
    server.read_raw(5).await;
    server.read_frame().await;
    server.send_raw(b"\x00LIS [1,2,3]\xff").await;

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(h.dispatcher.count(), 0);

    let mut buf = [0u8; 16];
    assert_eq!(server.try_read(&mut buf).await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_server_end_of_stream_releases_socket() {
    let mut h = harness(session_config(false), ScriptedIssuer::granting("ticket-1"));
    let handle = h.handle.clone();
    let task = tokio::spawn(h.session.run());

    let mut server = h.accepts.recv().await.unwrap();
    server.read_raw(5).await;
    server.read_frame().await;
    server.close_write().await;

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, ConnectionError::ConnectionClosed));
    assert_eq!(handle.phase(), Phase::Failed);

    let mut buf = [0u8; 16];
    assert_eq!(server.try_read(&mut buf).await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_outbound_frames_from_handle_and_dispatcher() {
    let mut h = harness(session_config(false), ScriptedIssuer::granting("ticket-1"));
    h.dispatcher.reply_to("PIN", Frame::new("PIN"));
    let handle = h.handle.clone();
    let task = tokio::spawn(h.session.run());

    let mut server = h.accepts.recv().await.unwrap();
    server.read_raw(5).await;
    server.read_frame().await;

    server.send(&Frame::new("PIN")).await;
    assert_eq!(server.read_frame().await, Frame::new("PIN"));

    let message = frame("MSG", json!({"channel": "Frontpage", "message": "hi"}));
    assert!(handle.send(message.clone()));
    assert_eq!(server.read_frame().await, message);

    handle.close();
    assert!(task.await.unwrap().is_ok());
    assert!(!handle.send(Frame::new("MSG")));

    // Logout shuts the socket down
    let mut buf = [0u8; 16];
    assert_eq!(server.try_read(&mut buf).await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_frames_sent_before_identify_are_dropped() {
    let mut h = harness(session_config(true), ScriptedIssuer::granting("ticket-1"));
    let handle = h.handle.clone();
    let task = tokio::spawn(h.session.run());

    let mut server = h.accepts.recv().await.unwrap();
    let request_len = handshake_request(TEST_HOST, TEST_PORT, DEFAULT_HANDSHAKE_ORIGIN).len();
    server.read_raw(request_len).await;

    handle.send(Frame::new("MSG"));
    tokio::time::sleep(Duration::from_millis(10)).await;

    server.send_raw(&upgrade_reply()).await;
    assert_eq!(server.read_frame().await.code(), "IDN");

    handle.close();
    assert!(task.await.unwrap().is_ok());
    let mut buf = [0u8; 16];
    assert_eq!(server.try_read(&mut buf).await.unwrap(), 0);
}
