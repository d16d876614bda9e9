use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocktrail_core::{EntryId, ItemId};

/// Ledger operation error.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The entry failed pre-commit validation; nothing was written.
    #[error("invalid ledger entry: {0}")]
    InvalidEntry(String),

    /// The backing store failed while writing or reading.
    #[error("ledger backend failure: {0}")]
    Backend(String),
}

/// Kind of mutation a ledger entry records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryAction {
    Add,
    Update,
    Delete,
    Transfer,
}

impl EntryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryAction::Add => "add",
            EntryAction::Update => "update",
            EntryAction::Delete => "delete",
            EntryAction::Transfer => "transfer",
        }
    }
}

impl core::fmt::Display for EntryAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payload attached to an entry, keyed by action kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryDetails {
    /// Payload of a `transfer` entry.
    Transfer {
        from: String,
        to: String,
        quantity: u64,
    },
    /// Payload of an `update` entry.
    QuantityChange {
        old_quantity: u64,
        new_quantity: u64,
    },
}

/// An immutable fact about a past mutation.
///
/// `sequence` is assigned by the store at commit time and is strictly
/// increasing across the whole ledger; it breaks ties between entries that
/// share a wall-clock timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub sequence: u64,
    pub action: EntryAction,
    pub item_id: ItemId,
    /// Destination item of a transfer (post-merge or newly created).
    pub new_item_id: Option<ItemId>,
    pub acting_user: String,
    pub timestamp: DateTime<Utc>,
    pub details: Option<EntryDetails>,
}

impl LedgerEntry {
    /// Quantity this entry contributes to demand, when it carries one.
    ///
    /// Only transfer payloads carry a demand quantity; update payloads record
    /// an old/new pair and contribute nothing.
    pub fn demand_quantity(&self) -> Option<u64> {
        match &self.details {
            Some(EntryDetails::Transfer { quantity, .. }) => Some(*quantity),
            _ => None,
        }
    }
}

/// A not-yet-committed ledger entry.
///
/// Drafts are validated before the store accepts them, so a malformed entry
/// is never partially written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub action: EntryAction,
    pub item_id: ItemId,
    pub new_item_id: Option<ItemId>,
    pub acting_user: String,
    pub timestamp: DateTime<Utc>,
    pub details: Option<EntryDetails>,
}

impl EntryDraft {
    pub fn add(item_id: ItemId, acting_user: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            action: EntryAction::Add,
            item_id,
            new_item_id: None,
            acting_user: acting_user.into(),
            timestamp: at,
            details: None,
        }
    }

    pub fn update(
        item_id: ItemId,
        old_quantity: u64,
        new_quantity: u64,
        acting_user: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: EntryAction::Update,
            item_id,
            new_item_id: None,
            acting_user: acting_user.into(),
            timestamp: at,
            details: Some(EntryDetails::QuantityChange {
                old_quantity,
                new_quantity,
            }),
        }
    }

    pub fn delete(item_id: ItemId, acting_user: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            action: EntryAction::Delete,
            item_id,
            new_item_id: None,
            acting_user: acting_user.into(),
            timestamp: at,
            details: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn transfer(
        item_id: ItemId,
        new_item_id: ItemId,
        from: impl Into<String>,
        to: impl Into<String>,
        quantity: u64,
        acting_user: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: EntryAction::Transfer,
            item_id,
            new_item_id: Some(new_item_id),
            acting_user: acting_user.into(),
            timestamp: at,
            details: Some(EntryDetails::Transfer {
                from: from.into(),
                to: to.into(),
                quantity,
            }),
        }
    }

    /// Validate the draft before it may be committed.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.acting_user.trim().is_empty() {
            return Err(LedgerError::InvalidEntry(
                "acting user cannot be empty".to_string(),
            ));
        }
        match (self.action, &self.details) {
            (EntryAction::Transfer, Some(EntryDetails::Transfer { from, to, quantity })) => {
                if self.new_item_id.is_none() {
                    return Err(LedgerError::InvalidEntry(
                        "transfer entry requires a destination item id".to_string(),
                    ));
                }
                if from == to {
                    return Err(LedgerError::InvalidEntry(
                        "transfer entry requires distinct warehouses".to_string(),
                    ));
                }
                if *quantity == 0 {
                    return Err(LedgerError::InvalidEntry(
                        "transfer entry requires a positive quantity".to_string(),
                    ));
                }
                Ok(())
            }
            (EntryAction::Transfer, _) => Err(LedgerError::InvalidEntry(
                "transfer entry requires a transfer payload".to_string(),
            )),
            (EntryAction::Update, Some(EntryDetails::QuantityChange { .. })) => Ok(()),
            (EntryAction::Update, _) => Err(LedgerError::InvalidEntry(
                "update entry requires an old/new quantity payload".to_string(),
            )),
            (EntryAction::Add | EntryAction::Delete, None) => Ok(()),
            (action, _) => Err(LedgerError::InvalidEntry(format!(
                "{action} entry does not take a payload"
            ))),
        }
    }

    /// Seal the draft into a committed entry.
    ///
    /// Only the store calls this, after validation, with the sequence it
    /// assigned.
    pub(crate) fn into_entry(self, id: EntryId, sequence: u64) -> LedgerEntry {
        LedgerEntry {
            id,
            sequence,
            action: self.action,
            item_id: self.item_id,
            new_item_id: self.new_item_id,
            acting_user: self.acting_user,
            timestamp: self.timestamp,
            details: self.details,
        }
    }

    /// Validate and seal in one step, for store implementations.
    pub fn commit(self, sequence: u64) -> Result<LedgerEntry, LedgerError> {
        self.validate()?;
        Ok(self.into_entry(EntryId::new(), sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn transfer_draft_validates() {
        let draft = EntryDraft::transfer(
            ItemId::new(),
            ItemId::new(),
            "WH1",
            "WH2",
            5,
            "alice",
            now(),
        );
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn transfer_draft_requires_distinct_warehouses_and_positive_quantity() {
        let same = EntryDraft::transfer(
            ItemId::new(),
            ItemId::new(),
            "WH1",
            "WH1",
            5,
            "alice",
            now(),
        );
        assert!(matches!(
            same.validate(),
            Err(LedgerError::InvalidEntry(_))
        ));

        let zero = EntryDraft::transfer(
            ItemId::new(),
            ItemId::new(),
            "WH1",
            "WH2",
            0,
            "alice",
            now(),
        );
        assert!(matches!(
            zero.validate(),
            Err(LedgerError::InvalidEntry(_))
        ));
    }

    #[test]
    fn action_payload_pairing_is_enforced() {
        let mut draft = EntryDraft::add(ItemId::new(), "alice", now());
        draft.details = Some(EntryDetails::QuantityChange {
            old_quantity: 1,
            new_quantity: 2,
        });
        assert!(matches!(
            draft.validate(),
            Err(LedgerError::InvalidEntry(_))
        ));

        let update_without_payload = EntryDraft {
            action: EntryAction::Update,
            item_id: ItemId::new(),
            new_item_id: None,
            acting_user: "alice".to_string(),
            timestamp: now(),
            details: None,
        };
        assert!(update_without_payload.validate().is_err());
    }

    #[test]
    fn blank_acting_user_is_rejected() {
        let draft = EntryDraft::delete(ItemId::new(), "  ", now());
        assert!(matches!(
            draft.validate(),
            Err(LedgerError::InvalidEntry(_))
        ));
    }

    #[test]
    fn demand_quantity_comes_only_from_transfer_payloads() {
        let transfer = EntryDraft::transfer(
            ItemId::new(),
            ItemId::new(),
            "WH1",
            "WH2",
            7,
            "alice",
            now(),
        )
        .commit(1)
        .unwrap();
        assert_eq!(transfer.demand_quantity(), Some(7));

        let update = EntryDraft::update(ItemId::new(), 3, 9, "alice", now())
            .commit(2)
            .unwrap();
        assert_eq!(update.demand_quantity(), None);
    }
}
