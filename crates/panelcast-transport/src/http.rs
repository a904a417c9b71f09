use std::time::Duration;

use tracing::debug;

use crate::error::{DeliveryError, Result};
use crate::traits::{Ack, Transport};

/// HTTP delivery: one POST of the raw ASCII payload per message.
///
/// Stateless — the panel's web server takes the body as-is. Connection
/// reuse is the client's concern; there is no session to manage.
pub struct HttpTransport {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Bound on one delivery round trip.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl Transport for HttpTransport {
    fn deliver(&mut self, payload: &[u8]) -> Result<Ack> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(payload.to_vec())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Http {
                status: status.as_u16(),
            });
        }
        debug!(url = %self.url, status = status.as_u16(), "http delivery accepted");
        Ok(response.text()?)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
