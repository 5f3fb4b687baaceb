//! Client cart state: one mirror, one authority, optimistic writes.
//!
//! The mirror is what the UI renders. It is owned by whichever store is
//! authoritative: the ephemeral cart while anonymous, the account cart once
//! signed in and reconciled. Every write goes through [`CartStateManager::dispatch`].
//!
//! The mirror is always the last confirmed cart with every in-flight write
//! replayed over it, in dispatch order. A write shows up as soon as it is
//! dispatched, whatever else is still waiting on the network. When the
//! authority answers, the write leaves the in-flight list and the mirror is
//! rebuilt. A success first folds the authority's line into the confirmed cart.
//!
//! Writes run side by side. Sign-in, sign-out and refresh wait for them to
//! finish and hold writes off while they swap the authority.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{RwLock, watch};
use tracing::{debug, info, instrument, warn};

use lashaz_core::{AccountId, Cart, CartError, CartLineItem, CartOwner, ProductId, Quantity};

use crate::config::ClientConfig;
use crate::ephemeral::EphemeralCart;
use crate::http::{HttpCartApi, HttpCatalog, StorefrontHttp};
use crate::reconciler::{ReconcileOutcome, Reconciler, ReconcilerState};
use crate::storage::{FileCartStorage, LocalCartStorage};
use crate::traits::{PersistentCartApi, StockOracle};

/// The store that currently decides cart contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Local anonymous cart
    Ephemeral,
    /// Server-side account cart
    Persistent(AccountId),
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ephemeral => write!(f, "ephemeral"),
            Self::Persistent(account) => write!(f, "persistent({account})"),
        }
    }
}

/// A cart write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartCommand {
    /// Add units, incrementing an existing line
    Add {
        product_id: ProductId,
        quantity: Quantity,
    },
    /// Overwrite a line's quantity
    SetQuantity {
        product_id: ProductId,
        quantity: Quantity,
    },
    /// Drop a line
    Remove { product_id: ProductId },
}

impl CartCommand {
    /// Product the command touches.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        match *self {
            Self::Add { product_id, .. }
            | Self::SetQuantity { product_id, .. }
            | Self::Remove { product_id } => product_id,
        }
    }
}

/// Identity bookkeeping. Writes hold it shared, transitions exclusively.
#[derive(Debug, Default)]
struct Session {
    /// Signed in, but the merge has not completed yet.
    pending: Option<AccountId>,
}

/// A dispatched write the authority has not answered yet.
#[derive(Debug)]
struct InFlight {
    seq: u64,
    command: CartCommand,
    /// Line to accumulate for an `Add`, with whatever display data was cached.
    line: Option<CartLineItem>,
}

impl InFlight {
    /// Replay onto `cart`, without stock checks.
    fn apply(&self, cart: &mut Cart) {
        let applied = match (self.command, &self.line) {
            (CartCommand::Add { .. }, Some(line)) => cart.accumulate(line.clone()).map(drop),
            (
                CartCommand::Add {
                    product_id,
                    quantity,
                },
                None,
            ) => cart
                .accumulate(CartLineItem::bare(product_id, quantity))
                .map(drop),
            (
                CartCommand::SetQuantity {
                    product_id,
                    quantity,
                },
                _,
            ) => cart.set_quantity(product_id, quantity, None).map(drop),
            (CartCommand::Remove { product_id }, _) => {
                cart.remove(product_id);
                Ok(())
            }
        };

        // The authority reports the same error and the write is dropped then
        if let Err(e) = applied {
            debug!(error = %e, command = ?self.command, "Optimistic update skipped");
        }
    }
}

/// Confirmed cart plus the writes still in flight over it.
#[derive(Debug)]
struct Writes {
    confirmed: Cart,
    in_flight: Vec<InFlight>,
    next_seq: u64,
    /// Newest write per product whose answer was folded into `confirmed`.
    answered: HashMap<ProductId, u64>,
}

impl Writes {
    fn new(confirmed: Cart) -> Self {
        Self {
            confirmed,
            in_flight: Vec::new(),
            next_seq: 0,
            answered: HashMap::new(),
        }
    }

    /// What the UI should see.
    fn view(&self) -> Cart {
        let mut cart = self.confirmed.clone();
        for write in &self.in_flight {
            write.apply(&mut cart);
        }
        cart
    }

    fn begin(&mut self, command: CartCommand, line: Option<CartLineItem>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.push(InFlight { seq, command, line });
        seq
    }

    /// Fold the authority's answer for write `seq` into the confirmed cart.
    ///
    /// Answers can arrive out of order. An answer older than one already
    /// folded in for the same product is stale and ignored.
    fn confirm(&mut self, seq: u64, command: CartCommand, line: Option<CartLineItem>) {
        let product_id = command.product_id();
        if self
            .answered
            .get(&product_id)
            .is_some_and(|&newest| newest > seq)
        {
            debug!(seq, %product_id, "Ignoring stale answer");
            return;
        }
        self.answered.insert(product_id, seq);
        match line {
            Some(line) => self.confirmed.set_absolute(line),
            None => {
                self.confirmed.remove(product_id);
            }
        }
    }

    fn settle(&mut self, seq: u64) {
        self.in_flight.retain(|write| write.seq != seq);
    }
}

/// Client-side cart coordinator.
pub struct CartStateManager {
    ephemeral: Arc<EphemeralCart>,
    persistent: Arc<dyn PersistentCartApi>,
    oracle: Arc<dyn StockOracle>,
    reconciler: Reconciler,
    mirror: watch::Sender<Cart>,
    writes: Mutex<Writes>,
    session: RwLock<Session>,
}

impl CartStateManager {
    /// Build a manager and load the starting cart.
    ///
    /// With an identity, the local cart is merged into the account cart
    /// first. If that merge fails the manager still starts, showing the
    /// local cart with the merge left pending for
    /// [`retry_reconciliation`](Self::retry_reconciliation).
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the local cart cannot be read.
    pub async fn start(
        storage: Arc<dyn LocalCartStorage>,
        oracle: Arc<dyn StockOracle>,
        persistent: Arc<dyn PersistentCartApi>,
        identity: Option<AccountId>,
    ) -> Result<Self, CartError> {
        let ephemeral = Arc::new(EphemeralCart::new(storage, Arc::clone(&oracle)));
        let initial = ephemeral.load()?;
        let (mirror, _) = watch::channel(initial.clone());

        let manager = Self {
            reconciler: Reconciler::new(Arc::clone(&ephemeral), Arc::clone(&persistent)),
            ephemeral,
            persistent,
            oracle,
            mirror,
            writes: Mutex::new(Writes::new(initial)),
            session: RwLock::new(Session::default()),
        };

        if let Some(account) = identity
            && let Err(e) = manager.sign_in(account).await
        {
            warn!(error = %e, "Starting on the local cart, reconciliation pending");
        }

        Ok(manager)
    }

    /// Build a manager talking to the storefront described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the HTTP client cannot be built or
    /// the local cart cannot be read.
    pub async fn from_config(
        config: &ClientConfig,
        identity: Option<AccountId>,
    ) -> Result<Self, CartError> {
        let http = StorefrontHttp::new(config.storefront_url.clone())?;
        let catalog = HttpCatalog::new(http.clone(), config.catalog_cache_ttl);
        Self::start(
            Arc::new(FileCartStorage::new(config.cart_file.clone())),
            Arc::new(catalog),
            Arc::new(HttpCartApi::new(http)),
            identity,
        )
        .await
    }

    /// Watch the mirror. Every optimistic write, confirmation and rollback
    /// is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.mirror.subscribe()
    }

    /// Current mirror contents.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.mirror.borrow().clone()
    }

    /// Which store currently owns the mirror.
    #[must_use]
    pub fn authority(&self) -> Authority {
        match self.mirror.borrow().owner() {
            CartOwner::Anonymous => Authority::Ephemeral,
            CartOwner::Authenticated(account) => Authority::Persistent(account),
        }
    }

    /// Reconciler state.
    #[must_use]
    pub fn reconciler_state(&self) -> ReconcilerState {
        self.reconciler.state()
    }

    /// Account whose merge failed and is waiting for a retry.
    pub async fn pending_reconciliation(&self) -> Option<AccountId> {
        self.session.read().await.pending
    }

    /// Apply a write.
    ///
    /// The mirror shows the change immediately, on top of any other writes
    /// still in flight. On success the line returned by the authority
    /// becomes confirmed; on failure only this write is taken back out of
    /// the mirror and the error is returned.
    ///
    /// # Errors
    ///
    /// Whatever the authoritative store rejects the write with.
    #[instrument(skip(self), fields(authority = %self.authority()))]
    pub async fn dispatch(&self, command: CartCommand) -> Result<Cart, CartError> {
        let _session = self.session.read().await;
        let authority = self.authority();

        let line = match command {
            CartCommand::Add {
                product_id,
                quantity,
            } => self
                .oracle
                .cached_display(product_id)
                .await
                .map(|display| display.line(product_id, quantity)),
            CartCommand::SetQuantity { .. } | CartCommand::Remove { .. } => None,
        };

        let seq = {
            let mut writes = self.writes();
            let seq = writes.begin(command, line);
            self.mirror.send_replace(writes.view());
            seq
        };

        let answer = self.forward(authority, command).await;

        let mut writes = self.writes();
        writes.settle(seq);
        let result = match answer {
            Ok(line) => {
                writes.confirm(seq, command, line);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, ?command, "Cart write rejected, taking it back out");
                Err(e)
            }
        };
        let view = writes.view();
        self.mirror.send_replace(view.clone());
        result.map(|()| view)
    }

    /// Re-read the mirror from the authoritative store.
    ///
    /// # Errors
    ///
    /// Returns the store's error; the mirror is left unchanged.
    pub async fn refresh(&self) -> Result<Cart, CartError> {
        let _session = self.session.write().await;
        let cart = match self.authority() {
            Authority::Ephemeral => self.ephemeral.load()?,
            Authority::Persistent(account) => Cart::from_items(
                CartOwner::Authenticated(account),
                self.persistent.load().await?,
            ),
        };
        self.reset(cart.clone());
        Ok(cart)
    }

    /// Switch to `account`, merging the local cart into the account cart.
    ///
    /// Signing in to the account already in charge does nothing. If the
    /// merge fails the local cart stays authoritative and the account is
    /// remembered as pending. A merge that landed but could not re-read the
    /// account cart still switches; [`refresh`](Self::refresh) fills in the
    /// rest.
    ///
    /// # Errors
    ///
    /// The reconciliation error (`SyncPartialFailure`, or the cause of an
    /// unreachable store).
    #[instrument(skip(self))]
    pub async fn sign_in(&self, account: AccountId) -> Result<ReconcileOutcome, CartError> {
        let mut session = self.session.write().await;
        if self.authority() == Authority::Persistent(account) {
            debug!("Already signed in, nothing to reconcile");
            return Ok(ReconcileOutcome::Reconciled(self.cart()));
        }

        match self.reconciler.reconcile(account).await {
            Ok(outcome) => {
                if let Some(cart) = outcome.cart() {
                    session.pending = None;
                    self.reset(cart.clone());
                    if matches!(outcome, ReconcileOutcome::MergedStale(_)) {
                        warn!("Account cart is authoritative but not re-read yet");
                    } else {
                        info!(lines = cart.len(), "Account cart is now authoritative");
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                session.pending = Some(account);
                warn!(error = %e, "Reconciliation failed, local cart stays authoritative");
                Err(e)
            }
        }
    }

    /// Retry a failed merge. Returns `None` when nothing is pending.
    ///
    /// # Errors
    ///
    /// Same as [`sign_in`](Self::sign_in).
    pub async fn retry_reconciliation(&self) -> Result<Option<ReconcileOutcome>, CartError> {
        let pending = self.session.read().await.pending;
        match pending {
            Some(account) => self.sign_in(account).await.map(Some),
            None => Ok(None),
        }
    }

    /// Go back to the anonymous cart.
    ///
    /// The account cart is left as it is on the server.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the local cart cannot be read; the
    /// mirror is then empty and anonymous.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<Cart, CartError> {
        let mut session = self.session.write().await;
        session.pending = None;
        self.reset(Cart::empty(CartOwner::Anonymous));

        let cart = self.ephemeral.load()?;
        self.reset(cart.clone());
        info!("Signed out, local cart is authoritative");
        Ok(cart)
    }

    /// Replace the confirmed cart. Only called with the session held
    /// exclusively, so nothing is in flight.
    fn reset(&self, cart: Cart) {
        let mut writes = self.writes();
        *writes = Writes::new(cart.clone());
        self.mirror.send_replace(cart);
    }

    fn writes(&self) -> MutexGuard<'_, Writes> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send `command` to the store in charge. Returns the line it confirmed,
    /// `None` when the line is gone.
    async fn forward(
        &self,
        authority: Authority,
        command: CartCommand,
    ) -> Result<Option<CartLineItem>, CartError> {
        match (authority, command) {
            (
                Authority::Ephemeral,
                CartCommand::Add {
                    product_id,
                    quantity,
                },
            ) => self.ephemeral.add(product_id, quantity).await.map(Some),
            (
                Authority::Ephemeral,
                CartCommand::SetQuantity {
                    product_id,
                    quantity,
                },
            ) => self
                .ephemeral
                .set_quantity(product_id, quantity)
                .await
                .map(Some),
            (Authority::Ephemeral, CartCommand::Remove { product_id }) => {
                self.ephemeral.remove(product_id).map(|_| None)
            }
            (
                Authority::Persistent(_),
                CartCommand::Add {
                    product_id,
                    quantity,
                },
            ) => self.persistent.add(product_id, quantity).await.map(Some),
            (
                Authority::Persistent(_),
                CartCommand::SetQuantity {
                    product_id,
                    quantity,
                },
            ) => self
                .persistent
                .set_quantity(product_id, quantity)
                .await
                .map(Some),
            (Authority::Persistent(_), CartCommand::Remove { product_id }) => {
                self.persistent.remove(product_id).await.map(|()| None)
            }
        }
    }
}
