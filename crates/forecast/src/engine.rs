use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use stocktrail_inventory::Item;
use stocktrail_ledger::{EntryAction, EntryFilter, LedgerError, LedgerQuery};

use crate::record::{ForecastRecord, LowStockEta};

/// Default trailing window, in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Overstock cutoff: quantity above three weeks of projected demand.
const OVERSTOCK_WEEKS: f64 = 3.0;

#[derive(Debug, Error)]
pub enum ForecastError {
    /// The window must span at least one day.
    #[error("forecast window must be at least one day")]
    InvalidWindow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Trailing time range over which ledger entries are aggregated.
///
/// `now` is passed in explicitly so repeated calls over unchanged state are
/// reproducible (and testable without a clock).
#[derive(Debug, Copy, Clone)]
pub struct ForecastWindow {
    pub days: u32,
    pub now: DateTime<Utc>,
}

impl ForecastWindow {
    pub fn new(days: u32, now: DateTime<Utc>) -> Self {
        Self { days, now }
    }

    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self {
            days: DEFAULT_WINDOW_DAYS,
            now,
        }
    }

    fn start(&self) -> DateTime<Utc> {
        self.now - Duration::days(i64::from(self.days))
    }
}

/// Forecast one item from its ledger window.
///
/// Demand is the sum of positive moved quantities on `transfer`/`update`
/// entries inside the window where the item is the transfer *source*; update
/// entries carry no moved quantity and contribute nothing, and an inbound
/// transfer is supply for the destination, not demand.
pub fn forecast_item<L: LedgerQuery>(
    item: &Item,
    ledger: &L,
    window: ForecastWindow,
) -> Result<ForecastRecord, ForecastError> {
    if window.days == 0 {
        return Err(ForecastError::InvalidWindow);
    }

    let filter = EntryFilter::for_source(item.id)
        .with_actions([EntryAction::Transfer, EntryAction::Update])
        .between(window.start(), window.now);
    let entries = ledger.entries(&filter)?;

    let total_moved: u64 = entries
        .iter()
        .filter_map(|e| e.demand_quantity())
        .filter(|q| *q > 0)
        .sum();
    let has_transfer_data = entries
        .iter()
        .any(|e| e.demand_quantity().is_some_and(|q| q > 0));

    let daily_average = total_moved as f64 / f64::from(window.days);
    let weekly_forecast = daily_average * 7.0;

    let days_until_low_stock = if daily_average == 0.0 {
        if item.is_low_stock() {
            LowStockEta::Days(0)
        } else {
            LowStockEta::Unknown
        }
    } else {
        let headroom = item.quantity as f64 - item.low_stock_threshold as f64;
        let days = (headroom / daily_average).floor();
        LowStockEta::Days(if days > 0.0 { days as u64 } else { 0 })
    };

    let overstock_threshold = weekly_forecast * OVERSTOCK_WEEKS;
    let is_overstocked = weekly_forecast > 0.0 && item.quantity as f64 > overstock_threshold;
    let overstock_amount = if is_overstocked {
        item.quantity as f64 - overstock_threshold
    } else {
        0.0
    };

    Ok(ForecastRecord {
        item_id: item.id,
        item_name: item.name.clone(),
        current_quantity: item.quantity,
        low_stock_threshold: item.low_stock_threshold,
        weekly_forecast,
        days_until_low_stock,
        is_overstocked,
        overstock_amount,
        has_transfer_data,
    })
}

/// Forecast a snapshot of items over one shared window.
pub fn forecast_items<L: LedgerQuery>(
    items: &[Item],
    ledger: &L,
    window: ForecastWindow,
) -> Result<Vec<ForecastRecord>, ForecastError> {
    items
        .iter()
        .map(|item| forecast_item(item, ledger, window))
        .collect()
}
