//! Core pipeline abstractions

pub mod config;
pub mod deadline;
pub mod error;
pub mod log;
pub mod quote;

// Re-export main types for cleaner imports
pub use deadline::Deadline;
pub use error::{PersistenceError, QuoteError, RequestFailure};
pub use quote::{ClientFacingQuote, NormalizedQuote, QuoteSink, QuoteSource, RawQuote};
