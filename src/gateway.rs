//! The `/cotacao` endpoint.
//!
//! A request moves through three stages, each with its own deadline started when
//! the stage begins:
//!
//! 1. Fetching: one bounded call to the upstream provider. Failure ends the
//!    request with a 500 and nothing is written.
//! 2. Persisting: one bounded insert. The outcome is logged and otherwise ignored.
//! 3. Responding: `{"bid": ...}` built from the quote that was just fetched.
//!
//! The pipeline runs on its own task so a requester that hangs up does not cut
//! the persistence attempt short.

use crate::core::{ClientFacingQuote, Deadline, QuoteError, QuoteSink, QuoteSource};
use crate::store::PersistOutcome;
use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub const QUOTE_PATH: &str = "/cotacao";

/// Body of the 500 response when no quote could be fetched.
pub const FETCH_FAILED_MESSAGE: &str = "Quote request unavailable";

#[derive(Debug, Clone, Copy)]
pub struct StageBudgets {
    pub fetch: Duration,
    pub persist: Duration,
}

pub struct QuoteGateway {
    source: Arc<dyn QuoteSource>,
    sink: Arc<dyn QuoteSink>,
    budgets: StageBudgets,
}

impl QuoteGateway {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        sink: Arc<dyn QuoteSink>,
        budgets: StageBudgets,
    ) -> Self {
        Self {
            source,
            sink,
            budgets,
        }
    }

    /// Runs one request through fetch, persist and response building.
    pub async fn handle(&self) -> Result<ClientFacingQuote, QuoteError> {
        let started = Instant::now();

        let raw = self
            .source
            .fetch_quote(Deadline::after(self.budgets.fetch))
            .await
            .inspect_err(|e| warn!(error = %e, "Upstream fetch failed"))?;
        debug!(elapsed = ?started.elapsed(), "Fetched upstream quote");

        let quote = raw.normalize();

        // Sibling of the fetch deadline, not carved out of what it left over.
        let outcome: PersistOutcome = self
            .sink
            .persist(&quote, Deadline::after(self.budgets.persist))
            .await
            .into();
        match &outcome {
            PersistOutcome::Written => debug!("Persisted quote"),
            PersistOutcome::Failed(e) => warn!(error = %e, "Quote not persisted"),
        }

        let response = ClientFacingQuote::from(&quote);
        info!(
            bid = %response.bid,
            persisted = outcome.is_written(),
            elapsed = ?started.elapsed(),
            "Quote served"
        );
        Ok(response)
    }
}

async fn get_quote(State(gateway): State<Arc<QuoteGateway>>) -> Response {
    let pipeline = tokio::spawn(async move { gateway.handle().await });

    match pipeline.await {
        Ok(Ok(quote)) => (StatusCode::OK, Json(quote)).into_response(),
        Ok(Err(_)) => (StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED_MESSAGE).into_response(),
        Err(e) => {
            error!(error = %e, "Quote pipeline task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED_MESSAGE).into_response()
        }
    }
}

pub fn router(gateway: Arc<QuoteGateway>) -> Router {
    Router::new()
        .route(QUOTE_PATH, get(get_quote))
        .with_state(gateway)
}

/// Serves the gateway on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, gateway: Arc<QuoteGateway>) -> Result<()> {
    info!("Quote gateway listening on {}", listener.local_addr()?);
    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Quote gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
