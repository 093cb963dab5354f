use crate::core::{Deadline, QuoteError, RequestFailure};
use tracing::debug;

/// Builds the HTTP client shared by the fetcher and the requester.
pub fn http_client(url: &str) -> Result<reqwest::Client, QuoteError> {
    reqwest::Client::builder()
        .user_agent("cotacao/0.1")
        .build()
        .map_err(|e| QuoteError::request(url, RequestFailure::Build(e)))
}

/// Performs one GET and reads the whole body before `deadline`.
///
/// No retries. If the deadline passes first the in-flight request is dropped,
/// closing its connection.
pub async fn get_text(
    client: &reqwest::Client,
    url: &str,
    deadline: Deadline,
) -> Result<String, QuoteError> {
    let call = async {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(RequestFailure::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestFailure::Status(status));
        }

        response.text().await.map_err(RequestFailure::Transport)
    };

    let body = deadline
        .run(call)
        .await
        .map_err(|_| RequestFailure::DeadlineExceeded(deadline.budget()))
        .and_then(|result| result)
        .map_err(|cause| QuoteError::request(url, cause))?;

    debug!(bytes = body.len(), "Read response body from {}", url);
    Ok(body)
}
