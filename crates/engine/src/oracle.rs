//! Price oracles for simulations and tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use option_settle_core::{Clock, FixedPoint, OracleError, PriceOracle, PriceQuote};
use parking_lot::RwLock;

/// Always quotes the same price, stamped with the clock's current time.
pub struct FixedPriceOracle {
    price: FixedPoint,
    clock: Arc<dyn Clock>,
}

impl FixedPriceOracle {
    pub fn new(price: FixedPoint, clock: Arc<dyn Clock>) -> Self {
        Self { price, clock }
    }
}

#[async_trait]
impl PriceOracle for FixedPriceOracle {
    async fn spot(&self) -> Result<PriceQuote, OracleError> {
        Ok(PriceQuote {
            price: self.price,
            published_at: self.clock.now(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum FeedState {
    Live(PriceQuote),
    Down,
}

/// Oracle whose quote is set by hand and which can be taken offline.
#[derive(Debug)]
pub struct ManualPriceOracle {
    state: RwLock<FeedState>,
}

impl ManualPriceOracle {
    #[must_use]
    pub fn new(price: FixedPoint, published_at: DateTime<Utc>) -> Self {
        Self {
            state: RwLock::new(FeedState::Live(PriceQuote {
                price,
                published_at,
            })),
        }
    }

    pub fn set_price(&self, price: FixedPoint, published_at: DateTime<Utc>) {
        *self.state.write() = FeedState::Live(PriceQuote {
            price,
            published_at,
        });
    }

    pub fn go_offline(&self) {
        *self.state.write() = FeedState::Down;
    }
}

#[async_trait]
impl PriceOracle for ManualPriceOracle {
    async fn spot(&self) -> Result<PriceQuote, OracleError> {
        match *self.state.read() {
            FeedState::Live(quote) => Ok(quote),
            FeedState::Down => Err(OracleError::Unavailable("feed offline".to_string())),
        }
    }
}
