use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::anyhow;

use stocktrail_core::ItemId;
use stocktrail_inventory::{Item, ItemQuery, ItemStoreError};
use stocktrail_ledger::{EntryFilter, LedgerEntry, LedgerError, LedgerQuery};

use crate::store::StockStore;
use crate::txn::{CommitError, Committed, ItemWrite, StockTxn};

#[derive(Debug, Default)]
struct State {
    items: HashMap<ItemId, Item>,
    entries: Vec<LedgerEntry>,
    /// Last assigned ledger sequence (strictly increasing, starts at 1).
    sequence: u64,
}

/// In-memory stock store.
///
/// Intended for tests/dev. A single lock guards items and ledger together,
/// so a commit is atomic and readers only ever observe fully committed
/// state.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    state: RwLock<State>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique_keys(items: &HashMap<ItemId, Item>) -> Result<(), CommitError> {
        let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(items.len());
        for item in items.values() {
            if !seen.insert((item.name.as_str(), item.warehouse.as_str())) {
                return Err(CommitError::DuplicateItem {
                    name: item.name.clone(),
                    warehouse: item.warehouse.clone(),
                });
            }
        }
        Ok(())
    }
}

impl ItemQuery for InMemoryStockStore {
    fn item(&self, id: ItemId) -> Result<Option<Item>, ItemStoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| ItemStoreError::Backend("lock poisoned".to_string()))?;
        Ok(state.items.get(&id).cloned())
    }

    fn find_by_warehouse_and_name(
        &self,
        name: &str,
        warehouse: &str,
    ) -> Result<Option<Item>, ItemStoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| ItemStoreError::Backend("lock poisoned".to_string()))?;
        Ok(state
            .items
            .values()
            .find(|i| i.name == name && i.warehouse == warehouse)
            .cloned())
    }

    fn items(&self) -> Result<Vec<Item>, ItemStoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| ItemStoreError::Backend("lock poisoned".to_string()))?;
        let mut items: Vec<Item> = state.items.values().cloned().collect();
        items.sort_by(|a, b| (&a.name, &a.warehouse).cmp(&(&b.name, &b.warehouse)));
        Ok(items)
    }
}

impl LedgerQuery for InMemoryStockStore {
    fn entries(&self, filter: &EntryFilter) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|_| LedgerError::Backend("lock poisoned".to_string()))?;
        let mut out: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        out.sort_by_key(|e| (e.timestamp, e.sequence));
        Ok(out)
    }
}

impl StockStore for InMemoryStockStore {
    fn commit(&self, txn: StockTxn) -> Result<Committed, CommitError> {
        // Reject a malformed entry before touching anything.
        txn.entry.validate()?;

        let mut state = self
            .state
            .write()
            .map_err(|_| CommitError::Backend(anyhow!("lock poisoned")))?;

        // Validate and stage every write against a scratch copy; the real
        // state is only replaced once the whole batch has passed.
        let mut staged = state.items.clone();
        let mut touched: Vec<ItemId> = Vec::with_capacity(txn.writes.len());

        for write in &txn.writes {
            let id = write.item_id();
            let current = staged.get(&id).map(|i| i.version).unwrap_or(0);
            if !write.expected().matches(current) {
                return Err(CommitError::VersionConflict(format!(
                    "item {id}: expected {:?}, found {current}",
                    write.expected()
                )));
            }
            match write {
                ItemWrite::Put { item, .. } => {
                    let mut stored = item.clone();
                    stored.version = current + 1;
                    staged.insert(id, stored);
                    touched.push(id);
                }
                ItemWrite::Remove { .. } => {
                    staged.remove(&id);
                }
            }
        }

        Self::check_unique_keys(&staged)?;

        let sequence = state.sequence + 1;
        let entry = txn.entry.commit(sequence)?;

        let items = touched
            .iter()
            .filter_map(|id| staged.get(id).cloned())
            .collect();

        state.items = staged;
        state.entries.push(entry.clone());
        state.sequence = sequence;

        Ok(Committed { items, entry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stocktrail_core::ExpectedVersion;
    use stocktrail_ledger::{EntryAction, EntryDraft};

    fn widget(warehouse: &str, quantity: u64) -> Item {
        Item {
            id: ItemId::new(),
            name: "Widget".to_string(),
            warehouse: warehouse.to_string(),
            quantity,
            low_stock_threshold: 10,
            version: 0,
        }
    }

    fn put_new(item: Item) -> StockTxn {
        let entry = EntryDraft::add(item.id, "tester", Utc::now());
        StockTxn::new(
            vec![ItemWrite::Put {
                item,
                expected: ExpectedVersion::Exact(0),
            }],
            entry,
        )
    }

    #[test]
    fn commit_assigns_versions_and_sequences() {
        let store = InMemoryStockStore::new();
        let item = widget("WH1", 5);
        let id = item.id;

        let committed = store.commit(put_new(item)).unwrap();
        assert_eq!(committed.entry.sequence, 1);
        assert_eq!(committed.item(id).unwrap().version, 1);

        let second = store.commit(put_new(widget("WH2", 3))).unwrap();
        assert_eq!(second.entry.sequence, 2);
    }

    #[test]
    fn stale_version_is_rejected_without_side_effects() {
        let store = InMemoryStockStore::new();
        let item = widget("WH1", 5);
        let id = item.id;
        store.commit(put_new(item.clone())).unwrap();

        // Writer thinks the item is still uncommitted.
        let stale = StockTxn::new(
            vec![ItemWrite::Put {
                item: Item {
                    quantity: 99,
                    ..item
                },
                expected: ExpectedVersion::Exact(0),
            }],
            EntryDraft::update(id, 5, 99, "tester", Utc::now()),
        );
        let err = store.commit(stale).unwrap_err();
        assert!(matches!(err, CommitError::VersionConflict(_)));
        assert_eq!(store.item(id).unwrap().unwrap().quantity, 5);
        assert_eq!(store.entries(&EntryFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_name_warehouse_key_is_rejected() {
        let store = InMemoryStockStore::new();
        store.commit(put_new(widget("WH1", 5))).unwrap();

        let err = store.commit(put_new(widget("WH1", 3))).unwrap_err();
        assert!(matches!(err, CommitError::DuplicateItem { .. }));
        assert_eq!(store.items().unwrap().len(), 1);
    }

    #[test]
    fn failed_batch_applies_nothing() {
        let store = InMemoryStockStore::new();
        let existing = widget("WH1", 5);
        let existing_id = existing.id;
        store.commit(put_new(existing)).unwrap();

        // Valid put plus a remove with a stale version: whole batch must die.
        let fresh = widget("WH2", 2);
        let txn = StockTxn::new(
            vec![
                ItemWrite::Put {
                    item: fresh.clone(),
                    expected: ExpectedVersion::Exact(0),
                },
                ItemWrite::Remove {
                    id: existing_id,
                    expected: ExpectedVersion::Exact(7),
                },
            ],
            EntryDraft::delete(existing_id, "tester", Utc::now()),
        );
        assert!(store.commit(txn).is_err());
        assert!(store.item(fresh.id).unwrap().is_none());
        assert!(store.item(existing_id).unwrap().is_some());
    }

    #[test]
    fn malformed_entry_is_never_written() {
        let store = InMemoryStockStore::new();
        let item = widget("WH1", 5);
        let txn = StockTxn::new(
            vec![ItemWrite::Put {
                item: item.clone(),
                expected: ExpectedVersion::Exact(0),
            }],
            // Update action without its payload.
            EntryDraft {
                action: EntryAction::Update,
                item_id: item.id,
                new_item_id: None,
                acting_user: "tester".to_string(),
                timestamp: Utc::now(),
                details: None,
            },
        );
        let err = store.commit(txn).unwrap_err();
        assert!(matches!(err, CommitError::InvalidEntry(_)));
        assert!(store.items().unwrap().is_empty());
        assert!(store.entries(&EntryFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn identical_queries_return_identical_sequences() {
        let store = InMemoryStockStore::new();
        store.commit(put_new(widget("WH1", 5))).unwrap();
        store.commit(put_new(widget("WH2", 3))).unwrap();

        let filter = EntryFilter::default().with_actions([EntryAction::Add]);
        let first = store.entries(&filter).unwrap();
        let second = store.entries(&filter).unwrap();
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }
}
