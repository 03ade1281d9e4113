use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use chain::quote::{OptionQuote, SpotQuote};
use feed::{AccessToken, CredentialSource, FeedError, QuoteFeed};

/// Credential source with a fixed answer and a call counter.
#[derive(Default)]
pub struct MockCredentials {
    pub token: Option<String>,
    pub calls: AtomicUsize,
}

impl MockCredentials {
    pub fn logged_in() -> Self {
        Self {
            token: Some("test-bearer".into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn logged_out() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for MockCredentials {
    async fn usable_token(&self) -> Result<Option<AccessToken>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.clone().map(AccessToken::new))
    }
}

/// Quote feed that synthesizes a quote for every requested symbol:
/// calls carry OI 1000, puts 1500, so a full 31-strike grid lands on
/// PCR = 1.5 exactly.
pub struct MockFeed {
    spots: HashMap<String, SpotQuote>,
    pub empty_quotes: AtomicBool,
    pub fail_spot: AtomicBool,
    pub sync_calls: AtomicUsize,
}

impl MockFeed {
    pub fn new() -> Self {
        let mut spots = HashMap::new();
        spots.insert(
            "NSE:NIFTY50-INDEX".to_string(),
            SpotQuote {
                last_price: 25_012.0,
                prev_close: 24_950.0,
            },
        );
        spots.insert(
            "NSE:NIFTYBANK-INDEX".to_string(),
            SpotQuote {
                last_price: 56_890.0,
                prev_close: 57_010.0,
            },
        );

        Self {
            spots,
            empty_quotes: AtomicBool::new(false),
            fail_spot: AtomicBool::new(false),
            sync_calls: AtomicUsize::new(0),
        }
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteFeed for MockFeed {
    async fn spot(&self, _token: &AccessToken, symbol: &str) -> Result<SpotQuote, FeedError> {
        if self.fail_spot.load(Ordering::SeqCst) {
            return Err(FeedError::Transport("connection reset by peer".into()));
        }

        self.spots
            .get(symbol)
            .copied()
            .ok_or_else(|| FeedError::Provider(format!("unknown symbol {}", symbol)))
    }

    async fn quotes(
        &self,
        _token: &AccessToken,
        symbols: &[String],
    ) -> Result<HashMap<String, OptionQuote>, FeedError> {
        if self.empty_quotes.load(Ordering::SeqCst) {
            return Ok(HashMap::new());
        }

        Ok(symbols
            .iter()
            .map(|symbol| {
                let oi = if symbol.ends_with("CE") { 1000 } else { 1500 };
                (
                    symbol.clone(),
                    OptionQuote {
                        oi: Some(oi),
                        prev_day_oi: Some(oi / 2),
                        ltp: Some(12.5),
                        volume: Some(420),
                    },
                )
            })
            .collect())
    }

    async fn sync_reference_data(&self) -> Result<(), FeedError> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
