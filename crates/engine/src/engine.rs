//! The settlement engine: writes claims against escrowed collateral and settles them
//! against the oracle price inside the exercise window.
//!
//! # Ordering
//!
//! Each `write`/`exercise` holds the instance's operation lock for its full duration,
//! so operations never interleave. Claim state sits behind a separate short lock that
//! is never held across a collaborator call:
//!
//! - `write` moves collateral into escrow first and mints only after that succeeds.
//! - `exercise` burns claims before paying out, so anything observing the engine
//!   during the payout transfer already sees the reduced balance. A failed payout
//!   re-mints the burned claims.
//!
//! A collaborator may read the engine while an operation is in flight. A `write` or
//! `exercise` issued from inside one, on the same task, fails with `Reentrant`
//! instead of waiting on the operation lock it is already under.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use option_settle_core::{
    collateral_amount, payout_value, AccountId, Clock, ContractTerms, EngineSettings,
    EventRecord, FixedPoint, Ledger, LedgerError, OracleError, PriceOracle, PriceQuote,
    SettlementEvent, WindowPhase,
};
use parking_lot::RwLock;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::claims::ClaimBook;
use crate::error::{ExerciseError, WriteError};

/// Capacity of the notification channel; slow subscribers see `Lagged`.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    /// Engines with an operation in progress on the current task.
    static ACTIVE_OPERATIONS: Vec<u64>;
}

/// Runtime wiring for an engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The only caller allowed to write.
    pub gateway: AccountId,
    /// Ledger account holding posted collateral.
    pub escrow_account: AccountId,
    /// Oldest oracle quote accepted at exercise. `None` accepts any age.
    pub max_price_age: Option<Duration>,
}

impl EngineConfig {
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: AccountId::new(gateway),
            escrow_account: AccountId::new("escrow"),
            max_price_age: None,
        }
    }

    #[must_use]
    pub fn with_escrow_account(mut self, escrow_account: AccountId) -> Self {
        self.escrow_account = escrow_account;
        self
    }

    #[must_use]
    pub const fn with_max_price_age(mut self, max_price_age: Duration) -> Self {
        self.max_price_age = Some(max_price_age);
        self
    }
}

impl From<&EngineSettings> for EngineConfig {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            gateway: settings.gateway.clone(),
            escrow_account: settings.escrow_account.clone(),
            max_price_age: settings.max_price_age_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    claims: ClaimBook,
    events: Vec<EventRecord>,
}

impl EngineState {
    fn record(&mut self, timestamp: DateTime<Utc>, event: SettlementEvent) -> EventRecord {
        let record = EventRecord {
            sequence: self.events.len() as u64 + 1,
            timestamp,
            event,
        };
        self.events.push(record.clone());
        record
    }
}

pub struct SettlementEngine {
    id: u64,
    terms: ContractTerms,
    config: EngineConfig,
    ledger: Arc<dyn Ledger>,
    oracle: Arc<dyn PriceOracle>,
    clock: Arc<dyn Clock>,
    operation: Mutex<()>,
    state: RwLock<EngineState>,
    notifier: broadcast::Sender<EventRecord>,
}

impl SettlementEngine {
    pub fn new(
        terms: ContractTerms,
        config: EngineConfig,
        ledger: Arc<dyn Ledger>,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (notifier, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(
            option_type = %terms.option_type(),
            exercise_type = %terms.exercise_type(),
            underlying = %terms.underlying_asset(),
            collateral = %terms.collateral_asset(),
            strike = %terms.strike_price(),
            window_begins = %terms.exercise_window_begins(),
            expiry = %terms.expiry(),
            "Settlement engine created"
        );
        Self {
            id: NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed),
            terms,
            config,
            ledger,
            oracle,
            clock,
            operation: Mutex::new(()),
            state: RwLock::new(EngineState::default()),
            notifier,
        }
    }

    #[must_use]
    pub const fn terms(&self) -> &ContractTerms {
        &self.terms
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> WindowPhase {
        self.terms.phase_at(self.clock.now())
    }

    #[must_use]
    pub fn claim_balance(&self, account: &AccountId) -> FixedPoint {
        self.state.read().claims.balance(account)
    }

    #[must_use]
    pub fn total_outstanding(&self) -> FixedPoint {
        self.state.read().claims.outstanding()
    }

    /// Collateral currently held in escrow, as reported by the ledger.
    pub async fn escrow_balance(&self) -> Result<FixedPoint, LedgerError> {
        self.ledger
            .balance(self.terms.collateral_asset(), &self.config.escrow_account)
            .await
    }

    /// Snapshot of every notification recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.state.read().events.clone()
    }

    /// Receives notifications recorded after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.notifier.subscribe()
    }

    /// Issues `amount` claims to `beneficiary`, pulling the required collateral from
    /// the beneficiary's account into escrow.
    ///
    /// # Errors
    ///
    /// See [`WriteError`]. Nothing changes on failure.
    pub async fn write(
        &self,
        caller: &AccountId,
        amount: FixedPoint,
        beneficiary: &AccountId,
    ) -> Result<(), WriteError> {
        let Some(active) = self.enter_operation() else {
            warn!(%caller, %beneficiary, "Write rejected: re-entered from a collaborator");
            return Err(WriteError::Reentrant);
        };
        ACTIVE_OPERATIONS
            .scope(active, self.write_exclusive(caller, amount, beneficiary))
            .await
    }

    async fn write_exclusive(
        &self,
        caller: &AccountId,
        amount: FixedPoint,
        beneficiary: &AccountId,
    ) -> Result<(), WriteError> {
        let _operation = self.operation.lock().await;

        if caller != &self.config.gateway {
            warn!(%caller, "Write rejected: caller is not the gateway");
            return Err(WriteError::Unauthorized {
                caller: caller.clone(),
            });
        }
        if amount.is_zero() {
            return Err(WriteError::InvalidAmount);
        }

        let now = self.clock.now();
        let begins = self.terms.exercise_window_begins();
        if now >= begins {
            warn!(%beneficiary, %now, %begins, "Write rejected: exercise window already open");
            return Err(WriteError::WindowAlreadyOpen { now, begins });
        }

        let collateral = collateral_amount(&self.terms, amount)?;

        // Reject an overflowing mint before any collateral moves.
        self.state.read().claims.check_mint(beneficiary, amount)?;

        let asset = self.terms.collateral_asset();
        let escrow = &self.config.escrow_account;
        let escrowed = self
            .ledger
            .transfer(asset, beneficiary, escrow, collateral)
            .await;
        if let Err(err) = escrowed {
            warn!(%beneficiary, %amount, %collateral, error = %err, "Write rejected by ledger");
            return Err(err.into());
        }
        debug!(%asset, from = %beneficiary, to = %escrow, %collateral, "Collateral escrowed");

        let record = {
            let mut state = self.state.write();
            state.claims.mint(beneficiary, amount)?;
            state.record(
                now,
                SettlementEvent::Written {
                    account: beneficiary.clone(),
                    amount,
                    collateral,
                },
            )
        };
        let _ = self.notifier.send(record);

        info!(%beneficiary, %amount, %collateral, "Claims written");
        Ok(())
    }

    /// Redeems `amount` of `holder`'s claims at the current oracle price, paying the
    /// intrinsic value out of escrow.
    ///
    /// An out-of-the-money exercise still burns the claims and pays nothing.
    ///
    /// # Errors
    ///
    /// See [`ExerciseError`]. Nothing changes on failure.
    pub async fn exercise(
        &self,
        amount: FixedPoint,
        holder: &AccountId,
    ) -> Result<(), ExerciseError> {
        let Some(active) = self.enter_operation() else {
            warn!(%holder, %amount, "Exercise rejected: re-entered from a collaborator");
            return Err(ExerciseError::Reentrant);
        };
        ACTIVE_OPERATIONS
            .scope(active, self.exercise_exclusive(amount, holder))
            .await
    }

    async fn exercise_exclusive(
        &self,
        amount: FixedPoint,
        holder: &AccountId,
    ) -> Result<(), ExerciseError> {
        let _operation = self.operation.lock().await;

        let now = self.clock.now();
        let begins = self.terms.exercise_window_begins();
        let expiry = self.terms.expiry();
        if now < begins {
            return Err(ExerciseError::WindowNotOpen { now, begins });
        }
        if now >= expiry {
            return Err(ExerciseError::WindowClosed { now, expiry });
        }
        if amount.is_zero() {
            return Err(ExerciseError::InvalidAmount);
        }

        let available = self.claim_balance(holder);
        if available < amount {
            warn!(
                %holder,
                %available,
                requested = %amount,
                "Exercise rejected: insufficient claims"
            );
            return Err(ExerciseError::InsufficientClaimBalance {
                available,
                requested: amount,
            });
        }

        let quote = self.fetch_price(now).await?;
        let payout = payout_value(&self.terms, quote.price, amount)?;

        self.state.write().claims.burn(holder, amount)?;

        if !payout.is_zero() {
            if let Err(err) = self.pay_out(holder, payout).await {
                if let Err(restore) = self.state.write().claims.mint(holder, amount) {
                    error!(%holder, %amount, error = %restore, "Failed to restore burned claims");
                }
                return Err(err);
            }
        }

        let record = self.state.write().record(
            now,
            SettlementEvent::Exercised {
                account: holder.clone(),
                amount,
                price: quote.price,
                payout,
            },
        );
        let _ = self.notifier.send(record);

        info!(%holder, %amount, price = %quote.price, %payout, "Claims exercised");
        Ok(())
    }

    /// Returns `None` if this engine already has an operation running on the current
    /// task; otherwise the active set to scope the new operation with.
    fn enter_operation(&self) -> Option<Vec<u64>> {
        let mut active = ACTIVE_OPERATIONS
            .try_with(Clone::clone)
            .unwrap_or_default();
        if active.contains(&self.id) {
            return None;
        }
        active.push(self.id);
        Some(active)
    }

    /// Fetches a spot quote and checks it is usable at `now`.
    ///
    /// A zero price is rejected for both option types. The valuation itself is defined
    /// at zero (a put pays its full strike), but a feed reporting zero for a listed
    /// underlying is treated as faulty rather than paid out against.
    async fn fetch_price(&self, now: DateTime<Utc>) -> Result<PriceQuote, ExerciseError> {
        let quote = self.oracle.spot().await.map_err(|err| {
            warn!(error = %err, "Exercise rejected: oracle unavailable");
            ExerciseError::OracleUnavailable(err)
        })?;

        if quote.price.is_zero() {
            warn!("Exercise rejected: oracle returned a zero price");
            return Err(OracleError::InvalidPrice.into());
        }

        if let Some(max_age) = self.config.max_price_age {
            // A quote stamped in the future counts as fresh.
            let age = (now - quote.published_at).to_std().unwrap_or_default();
            if age > max_age {
                warn!(
                    published_at = %quote.published_at,
                    age_secs = age.as_secs(),
                    max_age_secs = max_age.as_secs(),
                    "Exercise rejected: stale oracle price"
                );
                return Err(OracleError::Stale {
                    published_at: quote.published_at,
                    max_age_secs: i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX),
                }
                .into());
            }
        }

        Ok(quote)
    }

    async fn pay_out(&self, holder: &AccountId, payout: FixedPoint) -> Result<(), ExerciseError> {
        let asset = self.terms.collateral_asset();
        let escrow = &self.config.escrow_account;
        match self.ledger.transfer(asset, escrow, holder, payout).await {
            Ok(()) => {
                debug!(%asset, from = %escrow, to = %holder, %payout, "Payout transferred");
                Ok(())
            }
            Err(LedgerError::InsufficientFunds {
                account, available, ..
            }) if &account == escrow => {
                error!(
                    %asset,
                    %escrow,
                    %available,
                    required = %payout,
                    outstanding = %self.total_outstanding(),
                    "Escrow shortfall: outstanding claims are not fully collateralized"
                );
                Err(ExerciseError::EscrowShortfall {
                    available,
                    required: payout,
                })
            }
            Err(err) => {
                warn!(%holder, %payout, error = %err, "Payout rejected by ledger");
                Err(ExerciseError::Ledger(err))
            }
        }
    }
}
