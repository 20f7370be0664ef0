pub mod cache;
pub mod http;
pub mod manager;

pub use cache::TicketCache;
pub use http::{HttpTicketIssuer, DEFAULT_HTTP_TIMEOUT, DEFAULT_TICKET_URL};
pub use manager::{TicketManager, DEFAULT_TICKET_RENEWAL_INTERVAL};

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Errors from acquiring an API ticket.
///
/// Fatal during the first login of a session; ignored on background renewals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    #[error("Ticket request failed: {0}")]
    Transport(String),

    /// The server's own error text, passed through as-is.
    #[error("{0}")]
    Rejected(String),

    #[error("No ticket returned.")]
    MissingTicket,

    #[error("Malformed ticket response: {0}")]
    MalformedResponse(String),
}

/// Body of a ticket-issuance response. Unknown members are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketResponse {
    #[serde(default)]
    pub ticket: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TicketResponse {
    pub fn success(ticket: impl Into<String>) -> Self {
        Self {
            ticket: Some(ticket.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ticket: None,
            error: Some(error.into()),
        }
    }

    /// An empty `error` member counts as no error.
    pub fn into_ticket(self) -> Result<String, TicketError> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return Err(TicketError::Rejected(error));
        }
        self.ticket.ok_or(TicketError::MissingTicket)
    }
}

/// Login details for one account and the character it signs in as.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account: String,
    pub password: String,
    pub character: String,
}

impl Credentials {
    pub fn new(
        account: impl Into<String>,
        password: impl Into<String>,
        character: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            password: password.into(),
            character: character.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .field("character", &self.character)
            .finish()
    }
}

pub type TicketFuture =
    Pin<Box<dyn Future<Output = Result<TicketResponse, TicketError>> + Send + 'static>>;

/// Source of API tickets.
///
/// A request cannot be cancelled once issued, only dropped. The returned
/// future must not borrow from the issuer.
pub trait TicketIssuer: Send + Sync {
    fn request_ticket(&self, credentials: &Credentials) -> TicketFuture;
}

impl<T: TicketIssuer + ?Sized> TicketIssuer for Arc<T> {
    fn request_ticket(&self, credentials: &Credentials) -> TicketFuture {
        (**self).request_ticket(credentials)
    }
}
