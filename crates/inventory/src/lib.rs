//! Inventory domain module.
//!
//! This crate contains the item record and its business rules, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod query;

pub use item::{Item, ItemPatch, NewItem, DEFAULT_LOW_STOCK_THRESHOLD};
pub use query::{ItemQuery, ItemStoreError};
