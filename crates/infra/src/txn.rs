//! Atomic stock transaction: a batch of item writes plus one ledger entry.
//!
//! This is the unit the store commits — all of it or none of it. A visible
//! quantity change without its ledger entry (or the reverse) can never be
//! produced, because neither exists outside a committed transaction.

use thiserror::Error;

use stocktrail_core::{ExpectedVersion, ItemId};
use stocktrail_inventory::Item;
use stocktrail_ledger::{EntryDraft, LedgerEntry, LedgerError};

/// One write against the item store, guarded by an optimistic version.
#[derive(Debug, Clone)]
pub enum ItemWrite {
    /// Insert or replace an item. `expected` is the version the writer read
    /// (`Exact(0)` for "must not exist yet").
    Put {
        item: Item,
        expected: ExpectedVersion,
    },
    /// Remove an item entirely.
    Remove {
        id: ItemId,
        expected: ExpectedVersion,
    },
}

impl ItemWrite {
    pub fn expected(&self) -> ExpectedVersion {
        match self {
            ItemWrite::Put { expected, .. } | ItemWrite::Remove { expected, .. } => *expected,
        }
    }

    pub fn item_id(&self) -> ItemId {
        match self {
            ItemWrite::Put { item, .. } => item.id,
            ItemWrite::Remove { id, .. } => *id,
        }
    }
}

/// A batch of item writes paired with exactly one ledger entry draft.
#[derive(Debug, Clone)]
pub struct StockTxn {
    pub writes: Vec<ItemWrite>,
    pub entry: EntryDraft,
}

impl StockTxn {
    pub fn new(writes: Vec<ItemWrite>, entry: EntryDraft) -> Self {
        Self { writes, entry }
    }
}

/// Result of a committed transaction: the post-commit item states (removed
/// items are absent) and the sealed ledger entry.
#[derive(Debug, Clone)]
pub struct Committed {
    pub items: Vec<Item>,
    pub entry: LedgerEntry,
}

impl Committed {
    /// Post-commit state of one item, if the transaction kept it alive.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }
}

/// Commit failure. None of these leave any partial state behind.
#[derive(Debug, Error)]
pub enum CommitError {
    /// A write's expected version did not match the stored record.
    #[error("optimistic concurrency check failed: {0}")]
    VersionConflict(String),

    /// Committing would leave two items with the same (name, warehouse) key.
    #[error("duplicate item '{name}' in warehouse '{warehouse}'")]
    DuplicateItem { name: String, warehouse: String },

    /// The ledger entry draft failed validation.
    #[error("invalid ledger entry: {0}")]
    InvalidEntry(String),

    /// The backing store failed; the transaction may be retried.
    #[error("commit failed")]
    Backend(#[source] anyhow::Error),
}

impl From<LedgerError> for CommitError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::InvalidEntry(msg) => CommitError::InvalidEntry(msg),
            LedgerError::Backend(msg) => CommitError::Backend(anyhow::anyhow!(msg)),
        }
    }
}

impl CommitError {
    /// Whether a fresh attempt (re-read, re-validate, re-build) may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommitError::VersionConflict(_)
                | CommitError::DuplicateItem { .. }
                | CommitError::Backend(_)
        )
    }
}
