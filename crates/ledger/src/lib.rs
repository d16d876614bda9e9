//! Append-only audit ledger.
//!
//! Every committed inventory mutation is recorded exactly once as an
//! immutable [`LedgerEntry`]; the ordered history is the authoritative audit
//! trail and the input to demand forecasting. Entries are:
//!
//! - **immutable** (treat them as facts; never updated or deleted)
//! - **validated before commit** (a malformed entry is never partially written)
//! - **totally ordered** per item by (timestamp, commit sequence)

pub mod entry;
pub mod query;

pub use entry::{EntryAction, EntryDetails, EntryDraft, LedgerEntry, LedgerError};
pub use query::{EntryFilter, LedgerQuery};
