use super::util::{get_text, http_client};
use crate::core::{Deadline, QuoteError, QuoteSource, RawQuote};
use async_trait::async_trait;
use tracing::{debug, error, instrument};

/// Fetches the current rate from the AwesomeAPI `json/last/<pair>` endpoint.
pub struct AwesomeApiProvider {
    url: String,
    pair: String,
    client: reqwest::Client,
}

impl AwesomeApiProvider {
    pub fn new(url: &str, pair: &str) -> Result<Self, QuoteError> {
        Ok(AwesomeApiProvider {
            url: url.to_string(),
            pair: pair.to_string(),
            client: http_client(url)?,
        })
    }
}

#[async_trait]
impl QuoteSource for AwesomeApiProvider {
    #[instrument(
        name = "UpstreamFetch",
        skip(self, deadline),
        fields(pair = %self.pair, budget_ms = deadline.budget().as_millis() as u64)
    )]
    async fn fetch_quote(&self, deadline: Deadline) -> Result<RawQuote, QuoteError> {
        debug!("Requesting quote from {}", self.url);
        let body = get_text(&self.client, &self.url, deadline).await?;

        match RawQuote::decode(&body, &self.pair) {
            Ok(raw) => {
                debug!(bid = %raw.fields.bid, "Decoded upstream quote");
                Ok(raw)
            }
            Err(e) => {
                error!(
                    error = %e,
                    response = %body,
                    "Failed to parse upstream response"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RequestFailure;
    use crate::core::quote::tests::MOCK_JSON;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    async fn create_mock_server(template: ResponseTemplate) -> wiremock::MockServer {
        let mock_server = wiremock::MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/last/USD-BRL"))
            .respond_with(template)
            .expect(1)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider_for(mock_server: &wiremock::MockServer) -> AwesomeApiProvider {
        let url = format!("{}/json/last/USD-BRL", mock_server.uri());
        AwesomeApiProvider::new(&url, "USDBRL").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_quote() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string(MOCK_JSON)).await;
        let provider = provider_for(&mock_server);

        let raw = provider
            .fetch_quote(Deadline::after(Duration::from_secs(2)))
            .await
            .unwrap();

        assert_eq!(raw.pair, "USDBRL");
        assert_eq!(raw.fields.code, "USD");
        assert_eq!(raw.fields.codein, "BRL");
        assert_eq!(raw.fields.bid, "5.25");
        assert_eq!(raw.fields.ask, "5.2510");
    }

    #[tokio::test]
    async fn test_fetch_quote_malformed_body() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"status": 404, "code": "CoinNotExists"}"#),
        )
        .await;
        let provider = provider_for(&mock_server);

        let err = provider
            .fetch_quote(Deadline::after(Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::DecodeFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_quote_upstream_error_status() {
        let mock_server = create_mock_server(ResponseTemplate::new(429)).await;
        let provider = provider_for(&mock_server);

        let err = provider
            .fetch_quote(Deadline::after(Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuoteError::RequestFailed {
                cause: RequestFailure::Status(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_quote_times_out() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200)
                .set_body_string(MOCK_JSON)
                .set_delay(Duration::from_millis(600)),
        )
        .await;
        let provider = provider_for(&mock_server);

        let err = provider
            .fetch_quote(Deadline::after(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(err.is_deadline_exceeded());
    }

    #[tokio::test]
    async fn test_fetch_quote_unreachable() {
        // Nothing listens on the discard port of the loopback interface.
        let provider = AwesomeApiProvider::new("http://127.0.0.1:9/json/last/USD-BRL", "USDBRL")
            .unwrap();

        let err = provider
            .fetch_quote(Deadline::after(Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::RequestFailed { .. }));
    }
}
