use crate::ticket::{Credentials, TicketCache, TicketError, TicketFuture, TicketIssuer, TicketResponse};
use crate::timer::Deadline;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// How often a new API ticket is requested
pub const DEFAULT_TICKET_RENEWAL_INTERVAL: Duration = Duration::from_secs(600);

/// Keeps one account's API ticket fresh.
///
/// When the renewal timer fires a request is issued through the
/// [`TicketIssuer`]; when that request completes the next renewal is scheduled
/// one interval later, whatever the outcome. Successful tickets are written to
/// the shared [`TicketCache`]. Only one request is tracked at a time.
pub struct TicketManager<I> {
    issuer: I,
    credentials: Credentials,
    cache: TicketCache,
    renewal_interval: Duration,
    renewal: Deadline,
    in_flight: Option<TicketFuture>,
}

impl<I: TicketIssuer> TicketManager<I> {
    pub fn new(
        issuer: I,
        credentials: Credentials,
        cache: TicketCache,
        renewal_interval: Duration,
    ) -> Self {
        Self {
            issuer,
            credentials,
            cache,
            renewal_interval,
            renewal: Deadline::new(),
            in_flight: None,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn cache(&self) -> &TicketCache {
        &self.cache
    }

    pub fn renewal_interval(&self) -> Duration {
        self.renewal_interval
    }

    /// Cached ticket for this account, if one was ever fetched.
    pub fn current_ticket(&self) -> Option<String> {
        self.cache.get(&self.credentials.account)
    }

    /// When the next request will be issued, if one is scheduled.
    pub fn next_renewal(&self) -> Option<Instant> {
        self.renewal.instant()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// (Re)arm the renewal timer `delay` from now.
    pub fn schedule(&mut self, delay: Duration) {
        self.renewal.schedule(delay);
        debug!(account = %self.credentials.account, delay = ?delay, "Ticket renewal scheduled");
    }

    /// Stop the renewal timer and forget any outstanding request.
    pub fn cancel(&mut self) {
        self.renewal.cancel();
        if self.in_flight.take().is_some() {
            debug!(account = %self.credentials.account, "Dropped outstanding ticket request");
        }
    }

    /// Drive the timer and the outstanding request until a request completes.
    ///
    /// Returns the fetched ticket, already stored in the cache, or the reason
    /// the request failed. Cancel safe: dropping the future keeps the timer and
    /// any outstanding request intact.
    pub async fn next_outcome(&mut self) -> Result<String, TicketError> {
        loop {
            tokio::select! {
                () = self.renewal.elapsed() => self.issue(),
                response = await_response(&mut self.in_flight) => {
                    self.schedule(self.renewal_interval);
                    return self.complete(response);
                }
            }
        }
    }

    #[instrument(level = "debug", skip(self), fields(account = %self.credentials.account))]
    fn issue(&mut self) {
        self.renewal.cancel();
        if self.in_flight.is_some() {
            debug!("Replacing outstanding ticket request");
        }
        self.in_flight = Some(self.issuer.request_ticket(&self.credentials));
        debug!("Ticket request issued");
    }

    fn complete(&mut self, response: Result<TicketResponse, TicketError>) -> Result<String, TicketError> {
        match response.and_then(TicketResponse::into_ticket) {
            Ok(ticket) => {
                self.cache.insert(&self.credentials.account, ticket.clone());
                info!(account = %self.credentials.account, "Received login ticket");
                Ok(ticket)
            }
            Err(e) => {
                warn!(account = %self.credentials.account, error = %e, "Ticket request failed");
                Err(e)
            }
        }
    }
}

async fn await_response(in_flight: &mut Option<TicketFuture>) -> Result<TicketResponse, TicketError> {
    let Some(request) = in_flight.as_mut() else {
        return std::future::pending().await;
    };
    let response = request.await;
    *in_flight = None;
    response
}
