//! Legacy upgrade handshake.
//!
//! Older servers expect a draft-76 style upgrade request before they switch to
//! frame mode. The request below is fixed: the key fields and the 8-byte key
//! body are static rather than computed, which the server accepts. Its reply is
//! a block of header lines, a blank line and a 16-byte token, all of which are
//! discarded.

use crate::messages::ReceiveBuffer;
use tracing::{debug, trace};

/// Length of the token the server appends after its header block.
pub const HANDSHAKE_TOKEN_LEN: usize = 16;

pub const DEFAULT_HANDSHAKE_ORIGIN: &str = "http://www.f-list.net";

const KEY_1: &str = "?1:70X 1q057L74,6>\\";
const KEY_2: &str = "3qJ1  16=8v97(98:8Mah";
const KEY_BODY: &str = "d.;~w.A.";

/// Build the upgrade request sent right after the socket connects.
pub fn handshake_request(host: &str, port: u16, origin: &str) -> Vec<u8> {
    let mut request = String::with_capacity(256);
    request.push_str("GET / HTTP/1.1\r\n");
    request.push_str("Upgrade: WebSocket\r\n");
    request.push_str("Connection: Upgrade\r\n");
    request.push_str(&format!("Host: {}:{}\r\n", host, port));
    request.push_str(&format!("Origin: {}\r\n", origin));
    request.push_str("Cookie: \r\n");
    request.push_str(&format!("Sec-WebSocket-Key1: {}\r\n", KEY_1));
    request.push_str(&format!("Sec-WebSocket-Key2: {}\r\n", KEY_2));
    request.push_str("\r\n");
    request.push_str(KEY_BODY);
    request.into_bytes()
}

/// Discard the server's handshake reply from the front of `buffer`.
///
/// Returns `false` while the header block or its trailing token is still
/// incomplete; nothing is consumed in that case. Returns `true` once the reply
/// has been removed, leaving any bytes that followed it in place.
pub fn consume_handshake(buffer: &mut ReceiveBuffer) -> bool {
    let data = buffer.as_bytes();
    let Some(header_end) = find_header_end(data) else {
        trace!(buffered = data.len(), "Handshake headers incomplete");
        return false;
    };

    let consumed = header_end + HANDSHAKE_TOKEN_LEN;
    if data.len() < consumed {
        trace!(
            buffered = data.len(),
            needed = consumed,
            "Handshake token incomplete"
        );
        return false;
    }

    buffer.advance(consumed);
    debug!(consumed, remaining = buffer.len(), "Handshake reply consumed");
    true
}

/// Offset just past the blank line that ends the header block.
///
/// Walks from one line terminator to the next; the block ends at the first
/// terminator that starts right where the previous line ended.
fn find_header_end(data: &[u8]) -> Option<usize> {
    let mut line_start = 0;
    loop {
        let terminator = line_start + find_crlf(&data[line_start..])?;
        if terminator == line_start {
            return Some(terminator + 2);
        }
        line_start = terminator + 2;
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|window| window == b"\r\n")
}
