//! Infrastructure layer: the write boundary around the item store and ledger.
//!
//! All writers go through [`engine::TransferEngine`] or
//! [`engine::MutationRecorder`]; both express their effect as a single
//! [`txn::StockTxn`] so the item writes and the ledger append commit as one
//! atomic unit. Everything else receives read-only views.

pub mod engine;
pub mod service;
pub mod store;
pub mod txn;


pub use engine::{
    MutationError, MutationRecorder, QuantityError, RetryPolicy, TransferEngine, TransferError,
    TransferReceipt, TransferRequest,
};
pub use service::{ServiceError, StockService, StockStatus, WarehouseTotal};
pub use store::{InMemoryStockStore, StockStore};
pub use txn::{CommitError, Committed, ItemWrite, StockTxn};
