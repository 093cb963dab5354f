//! One-shot requester for the gateway.
//!
//! A single deadline covers building the request, the round trip and decoding the
//! body. Any failure is returned immediately; nothing is retried and nothing is
//! written locally unless a bid was obtained.

use crate::core::{ClientFacingQuote, Deadline, QuoteError, RequestFailure};
use crate::providers::util::{get_text, http_client};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct QuoteClient {
    server_url: String,
    budget: Duration,
}

impl QuoteClient {
    pub fn new(server_url: &str, budget: Duration) -> Self {
        Self {
            server_url: server_url.to_string(),
            budget,
        }
    }

    #[instrument(name = "GatewayRequest", skip(self), fields(url = %self.server_url))]
    pub async fn fetch_bid(&self) -> Result<ClientFacingQuote, QuoteError> {
        let deadline = Deadline::after(self.budget);
        let request = async {
            let client = http_client(&self.server_url)?;
            let body = get_text(&client, &self.server_url, deadline).await?;
            let quote: ClientFacingQuote = serde_json::from_str(&body)?;
            Ok::<_, QuoteError>(quote)
        };

        // Client construction and decode are inside the same budget as the call.
        let quote = deadline.run(request).await.unwrap_or_else(|_| {
            Err(QuoteError::request(
                &self.server_url,
                RequestFailure::DeadlineExceeded(self.budget),
            ))
        })?;
        debug!(bid = %quote.bid, "Received quote");
        Ok(quote)
    }
}

/// Parses the bid as a number, as required for the log line.
pub fn parse_bid(quote: &ClientFacingQuote) -> Result<f64, QuoteError> {
    quote
        .bid
        .trim()
        .parse::<f64>()
        .map_err(|e| QuoteError::DecodeFailed(format!("bid `{}` is not numeric: {e}", quote.bid)))
}

/// Appends one human-readable line to `path`, creating the file if needed.
pub fn append_bid_line(path: &Path, bid: f64) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open quote log: {}", path.display()))?;

    writeln!(file, "Dólar: {bid}")
        .with_context(|| format!("Failed to write quote log: {}", path.display()))?;
    debug!("Appended bid to {}", path.display());
    Ok(())
}

/// Fetches the bid, records it when `log_path` is set and returns it.
///
/// The log is only touched after a bid has been fetched and parsed.
pub async fn fetch_and_record(client: &QuoteClient, log_path: Option<&Path>) -> Result<f64> {
    let quote = client.fetch_bid().await?;
    let bid = parse_bid(&quote)?;
    if let Some(path) = log_path {
        append_bid_line(path, bid)?;
    }
    Ok(bid)
}
