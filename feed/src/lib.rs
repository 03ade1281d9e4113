//! Collaborator seams for the snapshot pipeline.
//!
//! The pipeline owns neither credential refresh nor the quote transport; it
//! consumes both through the traits here. Production implementations live
//! with the broker integration; tests plug in in-memory stubs.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use chain::quote::{OptionQuote, SpotQuote};

/// The provider caps batched quote lookups; requests are chunked to this.
pub const QUOTE_BATCH_SIZE: usize = 50;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider rejected request: {0}")]
    Provider(String),

    #[error("malformed provider payload: {0}")]
    Malformed(String),
}

/// Opaque bearer credential. Expiry tracking and refresh-token exchange are
/// the credential source's concern; consumers only ever read the value.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

// The secret must never land in logs or error chains.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Supplies a usable bearer token, refreshing behind the scenes when it can.
///
/// `Ok(None)` is the expected "nobody has authenticated yet" state, not an
/// error; callers record it and retry on their next cadence slot.
#[async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    async fn usable_token(&self) -> Result<Option<AccessToken>, FeedError>;
}

/// Quote transport capability.
#[async_trait]
pub trait QuoteFeed: Send + Sync + 'static {
    /// Spot quote for an underlying index symbol
    /// (e.g. `NSE:NIFTY50-INDEX`).
    async fn spot(&self, token: &AccessToken, symbol: &str) -> Result<SpotQuote, FeedError>;

    /// Batched contract quotes, keyed by requested symbol. Symbols the
    /// provider knows nothing about are simply absent from the result.
    /// Callers must chunk requests to `QUOTE_BATCH_SIZE`.
    async fn quotes(
        &self,
        token: &AccessToken,
        symbols: &[String],
    ) -> Result<HashMap<String, OptionQuote>, FeedError>;

    /// Re-download cached reference data (the symbol master). Independent of
    /// market hours; invoked on a slow maintenance cadence.
    async fn sync_reference_data(&self) -> Result<(), FeedError>;
}
