//! Non-transfer mutations (add / update / delete / reorder), each committed
//! together with its ledger entry as one transaction.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use stocktrail_core::{DomainError, ExpectedVersion, ItemId};
use stocktrail_inventory::{Item, ItemPatch, ItemQuery, NewItem};
use stocktrail_ledger::EntryDraft;

use crate::engine::retry::RetryPolicy;
use crate::store::StockStore;
use crate::txn::{CommitError, Committed, ItemWrite, StockTxn};

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Quantity cannot be negative")]
    NegativeQuantity,

    #[error("Item not found")]
    NotFound,

    #[error("item '{name}' already exists in warehouse '{warehouse}'")]
    DuplicateItem { name: String, warehouse: String },

    /// Commit could not complete within the bounded retry budget.
    #[error("mutation failed")]
    Failed,
}

impl From<DomainError> for MutationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound => MutationError::NotFound,
            other => MutationError::InvalidInput(other.to_string()),
        }
    }
}

/// Wraps single-item writes with the ledger-append discipline: the item
/// store write and the matching entry commit as one unit, or not at all.
pub struct MutationRecorder<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S> MutationRecorder<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }
}

/// Failure of one commit attempt inside the retry loop.
enum Attempt {
    Fatal(MutationError),
    Retry(String),
}

impl<S: StockStore> MutationRecorder<S> {
    /// Create an item and record an `add` entry.
    pub fn add_item(&self, new_item: NewItem, acting_user: &str) -> Result<Item, MutationError> {
        let item = new_item.into_item()?;
        self.run("add_item", |store| {
            if let Some(existing) = store
                .find_by_warehouse_and_name(&item.name, &item.warehouse)
                .map_err(|e| Attempt::Retry(e.to_string()))?
            {
                return Err(Attempt::Fatal(MutationError::DuplicateItem {
                    name: existing.name,
                    warehouse: existing.warehouse,
                }));
            }

            let txn = StockTxn::new(
                vec![ItemWrite::Put {
                    item: item.clone(),
                    expected: ExpectedVersion::Exact(0),
                }],
                EntryDraft::add(item.id, acting_user, Utc::now()),
            );
            commit_step(store, txn, |committed| {
                committed.item(item.id).cloned().ok_or(MutationError::Failed)
            })
        })
    }

    /// Patch an item and record an `update` entry with the old/new payload.
    pub fn update_item(
        &self,
        id: ItemId,
        patch: &ItemPatch,
        acting_user: &str,
    ) -> Result<Item, MutationError> {
        if patch.quantity.is_some_and(|q| q < 0) {
            return Err(MutationError::NegativeQuantity);
        }
        self.run("update_item", |store| {
            let current = read_item(store, id)?;
            let next = patch
                .apply_to(&current)
                .map_err(|e| Attempt::Fatal(MutationError::from(e)))?;

            // Moving onto an occupied (name, warehouse) key is a
            // deterministic conflict, not a transient one.
            if (next.name.as_str(), next.warehouse.as_str())
                != (current.name.as_str(), current.warehouse.as_str())
            {
                let occupant = store
                    .find_by_warehouse_and_name(&next.name, &next.warehouse)
                    .map_err(|e| Attempt::Retry(e.to_string()))?;
                if let Some(existing) = occupant.filter(|i| i.id != id) {
                    return Err(Attempt::Fatal(MutationError::DuplicateItem {
                        name: existing.name,
                        warehouse: existing.warehouse,
                    }));
                }
            }

            let txn = StockTxn::new(
                vec![ItemWrite::Put {
                    item: next,
                    expected: ExpectedVersion::Exact(current.version),
                }],
                EntryDraft::update(
                    id,
                    current.quantity,
                    patch.quantity.map_or(current.quantity, |q| q as u64),
                    acting_user,
                    Utc::now(),
                ),
            );
            commit_step(store, txn, |committed| {
                committed.item(id).cloned().ok_or(MutationError::Failed)
            })
        })
    }

    /// Remove an item and record a `delete` entry.
    pub fn delete_item(&self, id: ItemId, acting_user: &str) -> Result<(), MutationError> {
        self.run("delete_item", |store| {
            let current = read_item(store, id)?;
            let txn = StockTxn::new(
                vec![ItemWrite::Remove {
                    id,
                    expected: ExpectedVersion::Exact(current.version),
                }],
                EntryDraft::delete(id, acting_user, Utc::now()),
            );
            commit_step(store, txn, |_| Ok(()))
        })
    }

    /// Restock an item by `quantity` units and record the quantity change.
    pub fn reorder(
        &self,
        id: ItemId,
        quantity: u64,
        acting_user: &str,
    ) -> Result<Item, MutationError> {
        if quantity == 0 {
            return Err(MutationError::InvalidInput(
                "Quantity must be a positive number".to_string(),
            ));
        }
        let delta = i64::try_from(quantity).map_err(|_| {
            MutationError::InvalidInput("Quantity must be a positive number".to_string())
        })?;
        self.run("reorder", |store| {
            let current = read_item(store, id)?;
            let next = current
                .with_quantity_delta(delta)
                .map_err(|e| Attempt::Fatal(MutationError::from(e)))?;

            let txn = StockTxn::new(
                vec![ItemWrite::Put {
                    item: Item {
                        quantity: next.quantity,
                        ..current.clone()
                    },
                    expected: ExpectedVersion::Exact(current.version),
                }],
                EntryDraft::update(id, current.quantity, next.quantity, acting_user, Utc::now()),
            );
            commit_step(store, txn, |committed| {
                committed.item(id).cloned().ok_or(MutationError::Failed)
            })
        })
    }

    /// Bounded retry loop shared by every mutation.
    fn run<T>(
        &self,
        op: &'static str,
        mut step: impl FnMut(&S) -> Result<T, Attempt>,
    ) -> Result<T, MutationError> {
        let mut attempt = 1;
        loop {
            match step(&self.store) {
                Ok(value) => return Ok(value),
                Err(Attempt::Fatal(err)) => return Err(err),
                Err(Attempt::Retry(cause)) => {
                    if attempt >= self.retry.max_attempts {
                        warn!(op, attempts = attempt, cause = %cause, "mutation failed after retries");
                        return Err(MutationError::Failed);
                    }
                    debug!(op, attempt, cause = %cause, "retrying mutation");
                    self.retry.pause_after(attempt);
                    attempt += 1;
                }
            }
        }
    }
}

fn read_item<S: StockStore>(store: &S, id: ItemId) -> Result<Item, Attempt> {
    store
        .item(id)
        .map_err(|e| Attempt::Retry(e.to_string()))?
        .ok_or(Attempt::Fatal(MutationError::NotFound))
}

fn commit_step<S: StockStore, T>(
    store: &S,
    txn: StockTxn,
    on_success: impl FnOnce(Committed) -> Result<T, MutationError>,
) -> Result<T, Attempt> {
    match store.commit(txn) {
        Ok(committed) => on_success(committed).map_err(Attempt::Fatal),
        Err(err) if err.is_retryable() => Err(Attempt::Retry(err.to_string())),
        Err(CommitError::InvalidEntry(msg)) => {
            warn!(msg = %msg, "mutation produced an invalid ledger entry");
            Err(Attempt::Fatal(MutationError::Failed))
        }
        Err(_) => Err(Attempt::Fatal(MutationError::Failed)),
    }
}
