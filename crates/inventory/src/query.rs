//! Read-only contract over the item store.
//!
//! Writers never touch items through this trait; every mutation goes through
//! the transactional write boundary in the infrastructure layer.

use thiserror::Error;

use stocktrail_core::ItemId;

use crate::item::Item;

/// Item store read failure (backing storage, not domain).
#[derive(Debug, Error)]
pub enum ItemStoreError {
    #[error("item store backend failure: {0}")]
    Backend(String),
}

/// Read-only view of the item store.
///
/// Reads may block on IO against the backing store; callers should treat
/// them as potentially slow and must not assume point-in-time consistency
/// across separate calls.
pub trait ItemQuery: Send + Sync {
    /// Fetch one item by id.
    fn item(&self, id: ItemId) -> Result<Option<Item>, ItemStoreError>;

    /// Exact-match lookup used to decide merge-vs-create on transfer credit.
    fn find_by_warehouse_and_name(
        &self,
        name: &str,
        warehouse: &str,
    ) -> Result<Option<Item>, ItemStoreError>;

    /// Snapshot of all items.
    fn items(&self) -> Result<Vec<Item>, ItemStoreError>;
}

impl<S> ItemQuery for std::sync::Arc<S>
where
    S: ItemQuery + ?Sized,
{
    fn item(&self, id: ItemId) -> Result<Option<Item>, ItemStoreError> {
        (**self).item(id)
    }

    fn find_by_warehouse_and_name(
        &self,
        name: &str,
        warehouse: &str,
    ) -> Result<Option<Item>, ItemStoreError> {
        (**self).find_by_warehouse_and_name(name, warehouse)
    }

    fn items(&self) -> Result<Vec<Item>, ItemStoreError> {
        (**self).items()
    }
}
