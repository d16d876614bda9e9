//! Demand forecasting over the item snapshot and ledger history.
//!
//! Read-side only: given the same item snapshot and ledger contents the
//! output is deterministic and reproducible. Nothing here is persisted.

pub mod engine;
pub mod record;

pub use engine::{forecast_item, forecast_items, ForecastError, ForecastWindow, DEFAULT_WINDOW_DAYS};
pub use record::{ForecastRecord, LowStockEta};
