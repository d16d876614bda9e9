//! Cross-warehouse transfer orchestration.
//!
//! A transfer is validated fast (no side effects on any validation failure),
//! then executed as a single committed transaction: debit the source, credit
//! the destination (merge or create), append the `transfer` ledger entry.
//! Version conflicts and backend failures are retried with backoff; the
//! pre-transfer state is untouched by any failed attempt.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use stocktrail_core::{ExpectedVersion, ItemId};
use stocktrail_inventory::{Item, ItemQuery};
use stocktrail_ledger::EntryDraft;

use crate::engine::retry::RetryPolicy;
use crate::store::StockStore;
use crate::txn::{CommitError, ItemWrite, StockTxn};

/// Why a raw quantity failed to parse as a positive integer.
///
/// The three cases stay distinct so callers can report precisely; messages
/// match the original user-facing behaviour.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    #[error("Quantity must be a positive number")]
    NotANumber,
    #[error("Quantity must be a positive number")]
    NotPositive,
    #[error("Quantity must be an integer")]
    NotIntegral,
}

/// Parse a raw quantity into a positive integer.
pub fn parse_quantity(raw: &str) -> Result<u64, QuantityError> {
    let value: f64 = raw.trim().parse().map_err(|_| QuantityError::NotANumber)?;
    if !value.is_finite() {
        return Err(QuantityError::NotANumber);
    }
    if value <= 0.0 {
        return Err(QuantityError::NotPositive);
    }
    if value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(QuantityError::NotIntegral);
    }
    Ok(value as u64)
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{0}")]
    InvalidQuantity(QuantityError),

    #[error("Source and destination warehouses are required")]
    MissingWarehouse,

    #[error("Source and destination warehouses cannot be the same")]
    SameWarehouse,

    #[error("Item not found")]
    ItemNotFound,

    #[error("Source warehouse does not match item's current warehouse")]
    WarehouseMismatch,

    #[error("Insufficient quantity in source warehouse")]
    InsufficientStock,

    /// Merging would push the destination quantity past the representable
    /// maximum.
    #[error("Destination quantity is too large")]
    QuantityOverflow,

    /// Commit could not complete within the bounded retry budget.
    #[error("Failed to transfer item")]
    TransferFailed,
}

/// A client-issued transfer intent.
///
/// `quantity` arrives raw (transport-agnostic); the engine parses it so the
/// not-a-number / not-positive / not-integral cases stay distinguishable.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub item_id: ItemId,
    pub from_warehouse: String,
    pub to_warehouse: String,
    pub quantity: String,
    pub acting_user: String,
}

/// Caller-facing result of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub item_name: String,
    pub quantity: u64,
}

/// Outcome of one commit attempt: fatal errors surface immediately,
/// retryable ones feed the bounded retry loop.
enum AttemptError {
    Fatal(TransferError),
    Retryable(String),
}

pub struct TransferEngine<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S> TransferEngine<S> {
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

impl<S: StockStore> TransferEngine<S> {
    /// Move `quantity` of an item from one warehouse to another.
    pub fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, TransferError> {
        let quantity =
            parse_quantity(&request.quantity).map_err(TransferError::InvalidQuantity)?;
        if request.from_warehouse.trim().is_empty() || request.to_warehouse.trim().is_empty() {
            return Err(TransferError::MissingWarehouse);
        }
        if request.from_warehouse == request.to_warehouse {
            return Err(TransferError::SameWarehouse);
        }

        let mut attempt = 1;
        loop {
            match self.attempt(request, quantity) {
                Ok(receipt) => {
                    debug!(
                        item = %request.item_id,
                        from = %request.from_warehouse,
                        to = %request.to_warehouse,
                        quantity,
                        attempt,
                        "transfer committed"
                    );
                    return Ok(receipt);
                }
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Retryable(cause)) => {
                    if attempt >= self.retry.max_attempts {
                        warn!(
                            item = %request.item_id,
                            attempts = attempt,
                            cause = %cause,
                            "transfer failed after retries"
                        );
                        return Err(TransferError::TransferFailed);
                    }
                    debug!(item = %request.item_id, attempt, cause = %cause, "retrying transfer");
                    self.retry.pause_after(attempt);
                    attempt += 1;
                }
            }
        }
    }

    /// One optimistic attempt: read, validate, build the transaction, commit.
    fn attempt(
        &self,
        request: &TransferRequest,
        quantity: u64,
    ) -> Result<TransferReceipt, AttemptError> {
        let source = self
            .store
            .item(request.item_id)
            .map_err(|e| AttemptError::Retryable(e.to_string()))?
            .ok_or(AttemptError::Fatal(TransferError::ItemNotFound))?;

        // Guards against stale client state.
        if source.warehouse != request.from_warehouse {
            return Err(AttemptError::Fatal(TransferError::WarehouseMismatch));
        }
        if source.quantity < quantity {
            return Err(AttemptError::Fatal(TransferError::InsufficientStock));
        }

        let mut writes = Vec::with_capacity(2);

        // Debit: a source drained to zero is removed, not kept at zero.
        if source.quantity == quantity {
            writes.push(ItemWrite::Remove {
                id: source.id,
                expected: ExpectedVersion::Exact(source.version),
            });
        } else {
            writes.push(ItemWrite::Put {
                item: Item {
                    quantity: source.quantity - quantity,
                    ..source.clone()
                },
                expected: ExpectedVersion::Exact(source.version),
            });
        }

        // Credit: merge into an existing destination record, or create one
        // inheriting the source's threshold verbatim.
        let destination = self
            .store
            .find_by_warehouse_and_name(&source.name, &request.to_warehouse)
            .map_err(|e| AttemptError::Retryable(e.to_string()))?;
        let destination_id = match destination {
            Some(existing) => {
                let merged = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or(AttemptError::Fatal(TransferError::QuantityOverflow))?;
                writes.push(ItemWrite::Put {
                    item: Item {
                        quantity: merged,
                        ..existing.clone()
                    },
                    expected: ExpectedVersion::Exact(existing.version),
                });
                existing.id
            }
            None => {
                let created = Item {
                    id: ItemId::new(),
                    name: source.name.clone(),
                    warehouse: request.to_warehouse.clone(),
                    quantity,
                    low_stock_threshold: source.low_stock_threshold,
                    version: 0,
                };
                let id = created.id;
                writes.push(ItemWrite::Put {
                    item: created,
                    expected: ExpectedVersion::Exact(0),
                });
                id
            }
        };

        let entry = EntryDraft::transfer(
            source.id,
            destination_id,
            request.from_warehouse.clone(),
            request.to_warehouse.clone(),
            quantity,
            request.acting_user.clone(),
            Utc::now(),
        );

        match self.store.commit(StockTxn::new(writes, entry)) {
            Ok(_) => Ok(TransferReceipt {
                item_name: source.name,
                quantity,
            }),
            Err(err) if err.is_retryable() => Err(AttemptError::Retryable(err.to_string())),
            Err(CommitError::InvalidEntry(msg)) => {
                warn!(item = %request.item_id, msg = %msg, "transfer produced an invalid ledger entry");
                Err(AttemptError::Fatal(TransferError::TransferFailed))
            }
            Err(_) => Err(AttemptError::Fatal(TransferError::TransferFailed)),
        }
    }
}
