use serde::{Deserialize, Serialize};

use stocktrail_core::{DomainError, DomainResult, ItemId};

/// Default low-stock threshold applied when a caller does not provide one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u64 = 10;

/// A quantity of a named good physically located in one warehouse.
///
/// At most one `Item` exists per (name, warehouse) pair; the store enforces
/// that invariant at commit time. `quantity` is unsigned, so negative stock
/// is unrepresentable. `version` is the optimistic-concurrency counter:
/// 0 means "never committed", and every committed write bumps it by one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub warehouse: String,
    pub quantity: u64,
    pub low_stock_threshold: u64,
    #[serde(default)]
    pub version: u64,
}

impl Item {
    /// True when the item is at or below its low-stock threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }

    /// Copy of this item with `delta` applied to the quantity.
    ///
    /// Fails with a validation error when the result would go negative.
    pub fn with_quantity_delta(&self, delta: i64) -> DomainResult<Item> {
        let quantity = if delta >= 0 {
            self.quantity
                .checked_add(delta as u64)
                .ok_or_else(|| DomainError::validation("quantity overflow"))?
        } else {
            self.quantity
                .checked_sub(delta.unsigned_abs())
                .ok_or_else(|| DomainError::validation("Quantity cannot be negative"))?
        };
        Ok(Item {
            quantity,
            ..self.clone()
        })
    }
}

/// Input shape for creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub quantity: u64,
    pub warehouse: String,
    pub low_stock_threshold: Option<u64>,
}

impl NewItem {
    /// Validate and build the item record (fresh id, uncommitted version).
    pub fn into_item(self) -> DomainResult<Item> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.warehouse.trim().is_empty() {
            return Err(DomainError::validation("warehouse cannot be empty"));
        }
        Ok(Item {
            id: ItemId::new(),
            name: self.name,
            warehouse: self.warehouse,
            quantity: self.quantity,
            low_stock_threshold: self
                .low_stock_threshold
                .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            version: 0,
        })
    }
}

/// Partial update to an existing item. Absent fields are left untouched.
///
/// `quantity` is signed on the way in so that a negative target can be
/// rejected with a precise error instead of wrapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub warehouse: Option<String>,
    pub low_stock_threshold: Option<u64>,
}

impl ItemPatch {
    /// Apply the patch to `item`, returning the patched copy.
    pub fn apply_to(&self, item: &Item) -> DomainResult<Item> {
        let mut next = item.clone();
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            next.name = name.clone();
        }
        if let Some(quantity) = self.quantity {
            if quantity < 0 {
                return Err(DomainError::validation("Quantity cannot be negative"));
            }
            next.quantity = quantity as u64;
        }
        if let Some(warehouse) = &self.warehouse {
            if warehouse.trim().is_empty() {
                return Err(DomainError::validation("warehouse cannot be empty"));
            }
            next.warehouse = warehouse.clone();
        }
        if let Some(threshold) = self.low_stock_threshold {
            next.low_stock_threshold = threshold;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_item(quantity: u64, threshold: u64) -> Item {
        Item {
            id: ItemId::new(),
            name: "Widget".to_string(),
            warehouse: "WH1".to_string(),
            quantity,
            low_stock_threshold: threshold,
            version: 1,
        }
    }

    #[test]
    fn new_item_defaults_threshold_to_ten() {
        let item = NewItem {
            name: "Widget".to_string(),
            quantity: 5,
            warehouse: "WH1".to_string(),
            low_stock_threshold: None,
        }
        .into_item()
        .unwrap();
        assert_eq!(item.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
        assert_eq!(item.version, 0);
    }

    #[test]
    fn new_item_rejects_blank_name_and_warehouse() {
        let blank_name = NewItem {
            name: "  ".to_string(),
            quantity: 1,
            warehouse: "WH1".to_string(),
            low_stock_threshold: None,
        };
        assert!(matches!(
            blank_name.into_item(),
            Err(DomainError::Validation(_))
        ));

        let blank_warehouse = NewItem {
            name: "Widget".to_string(),
            quantity: 1,
            warehouse: "".to_string(),
            low_stock_threshold: None,
        };
        assert!(matches!(
            blank_warehouse.into_item(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn patch_rejects_negative_quantity() {
        let item = test_item(5, 10);
        let patch = ItemPatch {
            quantity: Some(-1),
            ..ItemPatch::default()
        };
        assert!(matches!(
            patch.apply_to(&item),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn patch_leaves_absent_fields_untouched() {
        let item = test_item(5, 10);
        let patch = ItemPatch {
            quantity: Some(8),
            ..ItemPatch::default()
        };
        let next = patch.apply_to(&item).unwrap();
        assert_eq!(next.quantity, 8);
        assert_eq!(next.name, item.name);
        assert_eq!(next.warehouse, item.warehouse);
        assert_eq!(next.low_stock_threshold, item.low_stock_threshold);
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        assert!(test_item(10, 10).is_low_stock());
        assert!(!test_item(11, 10).is_low_stock());
    }

    #[test]
    fn debit_below_zero_is_rejected() {
        let item = test_item(3, 10);
        assert!(item.with_quantity_delta(-4).is_err());
        assert_eq!(item.with_quantity_delta(-3).unwrap().quantity, 0);
    }

    proptest! {
        #[test]
        fn quantity_delta_never_goes_negative(start in 0u64..10_000, delta in -20_000i64..20_000) {
            let item = test_item(start, 10);
            match item.with_quantity_delta(delta) {
                Ok(next) => {
                    // u64 already rules out negatives; check arithmetic.
                    prop_assert_eq!(next.quantity as i128, start as i128 + delta as i128);
                }
                Err(_) => prop_assert!(delta < 0 && delta.unsigned_abs() > start),
            }
        }
    }
}
