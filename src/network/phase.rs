//! Session phase state machine.
//!
//! ```text
//! OFFLINE → CONNECT → HANDSHAKE → IDENTIFY → ACTIVE
//!              │                      ↑
//!              └──────────────────────┘  (legacy handshake disabled)
//!
//! any live phase → FAILED (error) | CLOSED (logout)
//! ```
//!
//! FAILED and CLOSED are terminal; a new login builds a new session.

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Waiting for the first ticket.
    #[default]
    Offline,

    /// Ticket obtained, outbound socket connect in progress.
    Connect,

    /// Legacy upgrade request sent, waiting for the server's reply.
    Handshake,

    /// Identify frame sent, waiting for the first server frame.
    Identify,

    /// Frames flow to the dispatcher.
    Active,

    /// Torn down after an error.
    Failed,

    /// Torn down at the user's request.
    Closed,
}

/// Rejected phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid session phase transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: Phase,
    pub to: Phase,
}

impl Phase {
    /// Validates a phase transition
    pub fn can_transition_to(&self, next: Phase) -> bool {
        use Phase::*;

        match (self, next) {
            (Offline, Connect) => true,
            (Connect, Handshake) => true,
            (Connect, Identify) => true,
            (Handshake, Identify) => true,
            (Identify, Active) => true,

            // Terminal phases have no way out
            (Failed, _) | (Closed, _) => false,
            (_, Failed) | (_, Closed) => true,

            _ => false,
        }
    }

    pub fn transition_to(&mut self, next: Phase) -> Result<(), InvalidTransition> {
        if self.can_transition_to(next) {
            *self = next;
            Ok(())
        } else {
            Err(InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Failed | Phase::Closed)
    }

    /// True once a socket exists and until the session is torn down.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Phase::Handshake | Phase::Identify | Phase::Active)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Active)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Offline => "OFFLINE",
            Phase::Connect => "CONNECT",
            Phase::Handshake => "HANDSHAKE",
            Phase::Identify => "IDENTIFY",
            Phase::Active => "ACTIVE",
            Phase::Failed => "FAILED",
            Phase::Closed => "CLOSED",
        };
        write!(f, "{}", name)
    }
}
