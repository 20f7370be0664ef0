use crate::ticket::{Credentials, TicketError, TicketFuture, TicketIssuer, TicketResponse};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_TICKET_URL: &str = "https://www.f-list.net/json/getApiTicket.php";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches API tickets from the ticket-issuance endpoint over HTTP.
///
/// The account name and password are posted as a form; the reply is a JSON
/// object with optional `ticket` and `error` members.
#[derive(Debug, Clone)]
pub struct HttpTicketIssuer {
    client: Client,
    url: String,
}

impl HttpTicketIssuer {
    pub fn new(url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self, TicketError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TicketError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Use a preconfigured HTTP client, e.g. one with custom proxy settings.
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TicketIssuer for HttpTicketIssuer {
    fn request_ticket(&self, credentials: &Credentials) -> TicketFuture {
        let client = self.client.clone();
        let url = self.url.clone();
        let form = [
            ("account", credentials.account.clone()),
            ("password", credentials.password.clone()),
            ("secure", "no".to_string()),
        ];

        Box::pin(async move {
            debug!(url = %url, "Requesting API ticket");

            let response = client.post(&url).form(&form).send().await.map_err(|e| {
                error!(error = %e, url = %url, "Ticket request failed");
                TicketError::Transport(e.to_string())
            })?;

            let status = response.status();
            if !status.is_success() {
                error!(status = %status, url = %url, "Ticket endpoint returned an error status");
                return Err(TicketError::Transport(format!("HTTP status {}", status)));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| TicketError::Transport(e.to_string()))?;

            serde_json::from_slice::<TicketResponse>(&body).map_err(|e| {
                error!(error = %e, body_size = body.len(), "Ticket response is not valid JSON");
                TicketError::MalformedResponse(e.to_string())
            })
        })
    }
}
