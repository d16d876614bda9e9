//! Write orchestration: the only components allowed to commit transactions.

pub mod mutation;
pub mod retry;
pub mod transfer;

pub use mutation::{MutationError, MutationRecorder};
pub use retry::RetryPolicy;
pub use transfer::{
    QuantityError, TransferEngine, TransferError, TransferReceipt, TransferRequest,
};
