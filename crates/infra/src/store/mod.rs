//! Stock store boundary.
//!
//! [`StockStore`] is the sole write surface over the item store and ledger:
//! reads come from the [`ItemQuery`] and [`LedgerQuery`] supertraits, writes
//! only through [`StockStore::commit`]. The in-memory implementation is the
//! reference semantics for durable backends.

pub mod in_memory;

pub use in_memory::InMemoryStockStore;

use stocktrail_inventory::ItemQuery;
use stocktrail_ledger::LedgerQuery;

use crate::txn::{CommitError, Committed, StockTxn};

/// Shared, multi-writer store for items and the audit ledger.
///
/// Implementations must commit the whole transaction or nothing: every
/// expected version is validated (and the one-item-per-(name, warehouse)
/// invariant checked) before any state changes, and readers never observe a
/// partially applied transaction.
pub trait StockStore: ItemQuery + LedgerQuery {
    fn commit(&self, txn: StockTxn) -> Result<Committed, CommitError>;
}

impl<S> StockStore for std::sync::Arc<S>
where
    S: StockStore + ?Sized,
{
    fn commit(&self, txn: StockTxn) -> Result<Committed, CommitError> {
        (**self).commit(txn)
    }
}
