use serde::{Deserialize, Serialize};

use stocktrail_core::ItemId;

/// Estimated time until an item falls to its low-stock threshold.
///
/// `Unknown` means the estimate cannot be made (no observed demand while the
/// item is still above threshold). It is a distinct variant, never a numeric
/// sentinel, so consumers cannot confuse it with a real day count.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowStockEta {
    Days(u64),
    Unknown,
}

impl LowStockEta {
    pub fn is_unknown(&self) -> bool {
        matches!(self, LowStockEta::Unknown)
    }

    pub fn days(&self) -> Option<u64> {
        match self {
            LowStockEta::Days(d) => Some(*d),
            LowStockEta::Unknown => None,
        }
    }
}

/// Derived demand/low-stock/overstock projection for one item.
///
/// Recomputed on every query; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub item_id: ItemId,
    pub item_name: String,
    pub current_quantity: u64,
    pub low_stock_threshold: u64,
    /// Projected units moved per week, from the trailing window.
    pub weekly_forecast: f64,
    pub days_until_low_stock: LowStockEta,
    pub is_overstocked: bool,
    pub overstock_amount: f64,
    /// Whether any entry in the window carried a positive moved quantity.
    pub has_transfer_data: bool,
}
