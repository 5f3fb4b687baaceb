//! One-shot merge of the anonymous cart into the account cart.
//!
//! # States
//!
//! ```text
//! Idle --reconcile()--> Reconciling --(success | failure | cancel)--> Idle
//! ```
//!
//! A trigger while `Reconciling` is dropped, not queued. The merge is an
//! absolute set per product, so rerunning it after a failure is safe.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lashaz_core::{AccountId, Cart, CartError, CartOwner};
use tracing::instrument;

use crate::ephemeral::EphemeralCart;
use crate::traits::PersistentCartApi;

/// Reconciler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    /// Not running
    Idle,
    /// A merge is in flight
    Reconciling,
}

impl fmt::Display for ReconcilerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Reconciling => write!(f, "Reconciling"),
        }
    }
}

/// Result of a reconciliation trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The merge ran; this is the account cart re-read afterwards.
    Reconciled(Cart),
    /// The merge ran and the local cart was cleared, but the account cart
    /// could not be re-read. Holds the merged local lines under the account;
    /// lines that were only on the account show up after a refresh.
    MergedStale(Cart),
    /// Another merge was already running; this trigger did nothing.
    AlreadyRunning,
}

impl ReconcileOutcome {
    /// The cart to show once the account is authoritative, if the merge ran.
    #[must_use]
    pub const fn cart(&self) -> Option<&Cart> {
        match self {
            Self::Reconciled(cart) | Self::MergedStale(cart) => Some(cart),
            Self::AlreadyRunning => None,
        }
    }
}

/// Holds the `Reconciling` flag; dropping it returns to `Idle`.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Merges the anonymous cart into the account cart.
pub struct Reconciler {
    ephemeral: Arc<EphemeralCart>,
    persistent: Arc<dyn PersistentCartApi>,
    running: AtomicBool,
}

impl Reconciler {
    /// Create an idle reconciler.
    #[must_use]
    pub fn new(ephemeral: Arc<EphemeralCart>, persistent: Arc<dyn PersistentCartApi>) -> Self {
        Self {
            ephemeral,
            persistent,
            running: AtomicBool::new(false),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ReconcilerState {
        if self.running.load(Ordering::Acquire) {
            ReconcilerState::Reconciling
        } else {
            ReconcilerState::Idle
        }
    }

    /// Push every local line to the account cart, then clear the local cart
    /// and return the account cart as the new source of truth.
    ///
    /// On failure the local cart is kept and whatever was applied stays
    /// applied; calling again finishes the job. Once every line is applied
    /// and the local cart is cleared the merge counts as done, even if the
    /// account cart cannot be re-read afterwards.
    ///
    /// # Errors
    ///
    /// - `SyncPartialFailure` if some lines were not written
    /// - the underlying error if the local or account cart is unreachable
    #[instrument(skip(self))]
    pub async fn reconcile(&self, account: AccountId) -> Result<ReconcileOutcome, CartError> {
        let Some(_running) = RunningGuard::acquire(&self.running) else {
            tracing::debug!("Reconciliation already running, trigger dropped");
            return Ok(ReconcileOutcome::AlreadyRunning);
        };

        let owner = CartOwner::Authenticated(account);
        let local = self.ephemeral.load()?;
        if !local.is_empty() {
            let report = self.persistent.sync(&local.snapshot()).await?;
            if !report.is_complete() {
                tracing::warn!(
                    applied = report.applied,
                    failed = report.failed.len(),
                    "Cart reconciliation partially failed, keeping local cart"
                );
                return Err(CartError::SyncPartialFailure {
                    applied: report.applied,
                    failed: report.failed,
                });
            }
            self.ephemeral.clear()?;
            tracing::info!(lines = local.len(), "Local cart merged into account cart");

            return match self.persistent.load().await {
                Ok(items) => Ok(ReconcileOutcome::Reconciled(Cart::from_items(owner, items))),
                Err(e) => {
                    tracing::warn!(error = %e, "Account cart unreadable after merge");
                    Ok(ReconcileOutcome::MergedStale(Cart::from_items(
                        owner,
                        local.items().iter().cloned(),
                    )))
                }
            };
        }

        let items = self.persistent.load().await?;
        Ok(ReconcileOutcome::Reconciled(Cart::from_items(owner, items)))
    }
}
