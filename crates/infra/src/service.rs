//! Callable contracts over the core (transport-agnostic).
//!
//! `StockService` is what an HTTP layer, CLI, or poller would hold: write
//! operations delegate to the transfer engine and mutation recorder, read
//! operations aggregate over the store and ledger without any locking of
//! their own.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocktrail_core::ItemId;
use stocktrail_forecast::{
    forecast_items, ForecastError, ForecastRecord, ForecastWindow, DEFAULT_WINDOW_DAYS,
};
use stocktrail_inventory::{Item, ItemPatch, ItemQuery, ItemStoreError, NewItem};
use stocktrail_ledger::{EntryFilter, LedgerEntry, LedgerQuery};

use crate::engine::{
    MutationError, MutationRecorder, RetryPolicy, TransferEngine, TransferError, TransferReceipt,
    TransferRequest,
};
use crate::store::StockStore;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The forecast query matched no items.
    #[error("No items found")]
    NoItemsFound,

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("store unavailable: {0}")]
    Store(String),
}

impl From<ItemStoreError> for ServiceError {
    fn from(value: ItemStoreError) -> Self {
        ServiceError::Store(value.to_string())
    }
}

/// Total quantity held per warehouse (chart/reporting read model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseTotal {
    pub warehouse: String,
    pub total_quantity: u64,
}

/// Low-stock vs in-stock item counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockStatus {
    pub low_stock: usize,
    pub in_stock: usize,
}

pub struct StockService<S> {
    store: S,
    transfers: TransferEngine<S>,
    mutations: MutationRecorder<S>,
}

impl<S: StockStore + Clone> StockService<S> {
    pub fn new(store: S) -> Self {
        Self::with_retry_policy(store, RetryPolicy::default())
    }

    pub fn with_retry_policy(store: S, retry: RetryPolicy) -> Self {
        Self {
            transfers: TransferEngine::with_retry_policy(store.clone(), retry),
            mutations: MutationRecorder::with_retry_policy(store.clone(), retry),
            store,
        }
    }
}

impl<S: StockStore> StockService<S> {
    pub fn add_item(&self, new_item: NewItem, acting_user: &str) -> Result<Item, MutationError> {
        self.mutations.add_item(new_item, acting_user)
    }

    pub fn update_item(
        &self,
        id: ItemId,
        patch: &ItemPatch,
        acting_user: &str,
    ) -> Result<Item, MutationError> {
        self.mutations.update_item(id, patch, acting_user)
    }

    pub fn delete_item(&self, id: ItemId, acting_user: &str) -> Result<(), MutationError> {
        self.mutations.delete_item(id, acting_user)
    }

    pub fn reorder(
        &self,
        id: ItemId,
        quantity: u64,
        acting_user: &str,
    ) -> Result<Item, MutationError> {
        self.mutations.reorder(id, quantity, acting_user)
    }

    pub fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, TransferError> {
        self.transfers.transfer(request)
    }

    /// Demand forecast for one item or the whole inventory.
    pub fn forecast(
        &self,
        item_id: Option<ItemId>,
        window_days: Option<u32>,
    ) -> Result<Vec<ForecastRecord>, ServiceError> {
        let items = match item_id {
            Some(id) => self.store.item(id)?.map(|i| vec![i]).unwrap_or_default(),
            None => self.store.items()?,
        };
        if items.is_empty() {
            return Err(ServiceError::NoItemsFound);
        }
        let window = ForecastWindow::new(window_days.unwrap_or(DEFAULT_WINDOW_DAYS), Utc::now());
        Ok(forecast_items(&items, &self.store, window)?)
    }

    /// Items at or below their low-stock threshold (polled externally).
    pub fn low_stock_alert(&self) -> Result<Vec<Item>, ServiceError> {
        let mut items = self.store.items()?;
        items.retain(Item::is_low_stock);
        Ok(items)
    }

    /// Quantity totals per warehouse, sorted by warehouse name.
    pub fn warehouse_totals(&self) -> Result<Vec<WarehouseTotal>, ServiceError> {
        let mut totals: BTreeMap<String, u64> = BTreeMap::new();
        for item in self.store.items()? {
            *totals.entry(item.warehouse).or_default() += item.quantity;
        }
        Ok(totals
            .into_iter()
            .map(|(warehouse, total_quantity)| WarehouseTotal {
                warehouse,
                total_quantity,
            })
            .collect())
    }

    /// Low-stock vs in-stock counts across the inventory.
    pub fn stock_status(&self) -> Result<StockStatus, ServiceError> {
        let items = self.store.items()?;
        let low_stock = items.iter().filter(|i| i.is_low_stock()).count();
        Ok(StockStatus {
            low_stock,
            in_stock: items.len() - low_stock,
        })
    }

    /// Audit history, ascending by (timestamp, sequence).
    pub fn history(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>, ServiceError> {
        self.store
            .entries(filter)
            .map_err(|e| ServiceError::Store(e.to_string()))
    }
}
