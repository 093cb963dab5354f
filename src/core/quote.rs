//! Quote records and the seams between pipeline stages

use crate::core::deadline::Deadline;
use crate::core::error::{PersistenceError, QuoteError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Field set the provider sends for one currency pair.
///
/// Every value is kept as the provider's text so nothing is reformatted on the way
/// to storage or to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuoteFields {
    pub code: String,
    pub codein: String,
    pub name: String,
    pub high: String,
    pub low: String,
    #[serde(rename = "varBid")]
    pub var_bid: String,
    #[serde(rename = "pctChange")]
    pub pct_change: String,
    pub bid: String,
    pub ask: String,
    pub timestamp: String,
    pub create_date: String,
}

/// Provider payload: the pair key (e.g. `USDBRL`) and its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQuote {
    pub pair: String,
    pub fields: QuoteFields,
}

impl RawQuote {
    /// Decodes a provider body, keeping only the entry keyed by `pair`.
    pub fn decode(body: &str, pair: &str) -> Result<Self, QuoteError> {
        let mut entries: HashMap<String, QuoteFields> = serde_json::from_str(body)?;
        let fields = entries
            .remove(pair)
            .ok_or_else(|| QuoteError::DecodeFailed(format!("no `{pair}` entry in payload")))?;
        Ok(Self {
            pair: pair.to_string(),
            fields,
        })
    }

    pub fn normalize(self) -> NormalizedQuote {
        let f = self.fields;
        NormalizedQuote {
            code: f.code,
            code_in: f.codein,
            name: f.name,
            high: f.high,
            low: f.low,
            var_bid: f.var_bid,
            pct_change: f.pct_change,
            bid: f.bid,
            ask: f.ask,
            timestamp: f.timestamp,
            create_date: f.create_date,
        }
    }
}

/// Flat quote record handed to storage. Only built from a decoded [`RawQuote`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedQuote {
    pub code: String,
    pub code_in: String,
    pub name: String,
    pub high: String,
    pub low: String,
    pub var_bid: String,
    pub pct_change: String,
    pub bid: String,
    pub ask: String,
    pub timestamp: String,
    pub create_date: String,
}

/// The response body promised to requesters: `{"bid": "<text>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFacingQuote {
    pub bid: String,
}

impl From<&NormalizedQuote> for ClientFacingQuote {
    fn from(quote: &NormalizedQuote) -> Self {
        Self {
            bid: quote.bid.clone(),
        }
    }
}

/// One bounded fetch from the external provider.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, deadline: Deadline) -> Result<RawQuote, QuoteError>;
}

/// One bounded, best-effort write of an observed quote.
#[async_trait]
pub trait QuoteSink: Send + Sync {
    async fn persist(
        &self,
        quote: &NormalizedQuote,
        deadline: Deadline,
    ) -> Result<(), PersistenceError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const MOCK_JSON: &str = r#"{
        "USDBRL": {
            "code": "USD",
            "codein": "BRL",
            "name": "Dólar Americano/Real Brasileiro",
            "high": "5.2750",
            "low": "5.2010",
            "varBid": "0.0120",
            "pctChange": "0.23",
            "bid": "5.25",
            "ask": "5.2510",
            "timestamp": "1729180800",
            "create_date": "2024-10-17 13:00:00"
        }
    }"#;

    #[test]
    fn test_decode_keeps_text_verbatim() {
        let raw = RawQuote::decode(MOCK_JSON, "USDBRL").unwrap();
        assert_eq!(raw.pair, "USDBRL");
        assert_eq!(raw.fields.bid, "5.25");
        assert_eq!(raw.fields.high, "5.2750");
        assert_eq!(raw.fields.var_bid, "0.0120");
        assert_eq!(raw.fields.create_date, "2024-10-17 13:00:00");

        let quote = raw.normalize();
        assert_eq!(quote.code, "USD");
        assert_eq!(quote.code_in, "BRL");
        assert_eq!(quote.pct_change, "0.23");
        assert_eq!(quote.ask, "5.2510");
        assert_eq!(quote.timestamp, "1729180800");
    }

    #[test]
    fn test_decode_is_repeatable() {
        let first = RawQuote::decode(MOCK_JSON, "USDBRL").unwrap().normalize();
        let second = RawQuote::decode(MOCK_JSON, "USDBRL").unwrap().normalize();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_rejects_missing_pair() {
        let err = RawQuote::decode(MOCK_JSON, "EURBRL").unwrap_err();
        assert!(matches!(err, QuoteError::DecodeFailed(_)));
        assert!(err.to_string().contains("EURBRL"));
    }

    #[test]
    fn test_decode_rejects_malformed_body() {
        let err = RawQuote::decode("<html>busy</html>", "USDBRL").unwrap_err();
        assert!(matches!(err, QuoteError::DecodeFailed(_)));

        // Numeric instead of text fields is a shape mismatch too.
        let numeric = r#"{"USDBRL": {"code": "USD", "bid": 5.25}}"#;
        let err = RawQuote::decode(numeric, "USDBRL").unwrap_err();
        assert!(matches!(err, QuoteError::DecodeFailed(_)));
    }

    #[test]
    fn test_client_facing_body_is_exact() {
        let quote = RawQuote::decode(MOCK_JSON, "USDBRL").unwrap().normalize();
        let body = serde_json::to_string(&ClientFacingQuote::from(&quote)).unwrap();
        assert_eq!(body, r#"{"bid":"5.25"}"#);
    }
}
